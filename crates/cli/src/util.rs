//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rq_core::{Change, Record};
use serde_json::Value;
use std::path::Path;

/// Load a JSON array of objects from disk.
pub fn load_rows(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read result set: {}", path.display()))?;
    let rows = serde_json::from_str(&text).with_context(|| {
        format!("Result set is not a JSON array of objects: {}", path.display())
    })?;
    Ok(rows)
}

/// Render one change as a colored listing line.
pub fn format_change(change: &Change, id_field: &str) -> String {
    let id = display_value(change.record().get(id_field));
    match change {
        Change::Add { index, .. } => {
            format!("  {} {} @ {}", "+".green(), id, index)
        }
        Change::Update { index, previous_index, .. } if index != previous_index => {
            format!("  {} {} @ {} (was {})", "~".yellow(), id, index, previous_index)
        }
        Change::Update { index, .. } => {
            format!("  {} {} @ {}", "~".yellow(), id, index)
        }
        Change::Delete { index, .. } => {
            format!("  {} {} @ {}", "-".red(), id, index)
        }
    }
}

/// Strings print bare; everything else uses its JSON form.
fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "?".to_string(),
    }
}
