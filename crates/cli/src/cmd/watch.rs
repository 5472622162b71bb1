//! Poll a result set document and stream change events

use crate::config::WatchConfig;
use crate::source::FileSource;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use reconciler::{ChangeSink, PeriodicUpdater, QueryKind, Reconciler};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub async fn run(
    source: &Path,
    id_field: Option<String>,
    interval_ms: Option<u64>,
    json: bool,
    config: Option<&Path>,
) -> Result<()> {
    // 1. Resolve configuration (flags take precedence over the file)
    let defaults = match config {
        Some(path) => WatchConfig::load(path)?,
        None => WatchConfig::default(),
    };
    let id_field = id_field.unwrap_or(defaults.id_field);
    let interval = Duration::from_millis(interval_ms.unwrap_or(defaults.interval_ms));

    // 2. Wire provider, sinks and reconciler
    let provider = Arc::new(FileSource::new(source));
    let (change_tx, mut changes) = mpsc::channel(256);
    let (summary_tx, mut summaries) = mpsc::channel(64);
    let reconciler = Arc::new(
        Reconciler::new(provider, ChangeSink::Events(change_tx), id_field.clone())
            .with_completion(summary_tx),
    );

    // 3. Seed, so the first poll diffs instead of re-seeding
    let seeded = reconciler.fetch().await?;
    if !json {
        println!(
            "Watching {} ({} rows, every {:?})",
            source.display().to_string().cyan(),
            seeded.rows.len(),
            interval
        );
        println!();
    }

    // 4. Print change events as they arrive
    let printer = tokio::spawn({
        let id_field = id_field.clone();
        async move {
            while let Some(change) = changes.recv().await {
                if json {
                    match serde_json::to_string(&change) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to encode change event: {}", e),
                    }
                } else {
                    println!("{}", util::format_change(&change, &id_field));
                }
            }
        }
    });

    // 5. Pass summaries stay at debug level so quiet passes make no noise
    let summary_task = tokio::spawn(async move {
        while let Some(summary) = summaries.recv().await {
            debug!(
                "Pass completed ({} rows, {} total)",
                summary.rows.len(),
                summary.total
            );
        }
    });

    // 6. Poll until interrupted
    let updater = PeriodicUpdater::new(reconciler, interval, QueryKind::All);
    tokio::select! {
        result = updater.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            if !json {
                println!();
                println!("{}", "Stopped".dimmed());
            }
        }
    }

    printer.abort();
    summary_task.abort();
    Ok(())
}
