//! File-backed query provider
//!
//! Reads a JSON document containing an array of objects on every fetch.
//! Stands in for a remote query endpoint when watching a local document.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reconciler::{QueryProvider, QueryResult, RangeArgs};
use rq_core::Record;
use std::path::{Path, PathBuf};

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    async fn read_rows(&self) -> Result<Vec<Record>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read result set: {}", self.path.display()))?;
        let rows: Vec<Record> = serde_json::from_str(&text).with_context(|| {
            format!(
                "Result set is not a JSON array of objects: {}",
                self.path.display()
            )
        })?;
        Ok(rows)
    }
}

#[async_trait]
impl QueryProvider for FileSource {
    async fn fetch_all(&self) -> Result<QueryResult> {
        let rows = self.read_rows().await?;
        let total = rows.len();
        Ok(QueryResult { rows, total })
    }

    async fn fetch_range(&self, args: RangeArgs) -> Result<QueryResult> {
        let rows = self.read_rows().await?;
        let total = rows.len();
        let end = (args.start + args.count).min(rows.len());
        let page = rows[args.start.min(rows.len())..end].to_vec();
        Ok(QueryResult { rows: page, total })
    }
}
