//! Diff two JSON result sets

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use rq_core::{diff_snapshots, Change, Snapshot};
use std::path::Path;

pub async fn run(old: &Path, new: &Path, id_field: &str, offset: usize, json: bool) -> Result<()> {
    // 1. Load both result sets
    let old_rows = util::load_rows(old)?;
    let new_rows = util::load_rows(new)?;

    // 2. Index the prior set and diff
    let prior = Snapshot::build(old_rows, id_field)?;
    let outcome = diff_snapshots(&prior, &new_rows, id_field, offset)?;

    // 3. Machine-readable output: one JSON line per change
    if json {
        for change in &outcome.changes {
            println!("{}", serde_json::to_string(change)?);
        }
        return Ok(());
    }

    // 4. Colored listing
    println!("{}", "Result Set Diff".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("From: {} ({} rows)", old.display().to_string().cyan(), prior.len());
    println!("To:   {} ({} rows)", new.display().to_string().cyan(), new_rows.len());
    println!();

    if outcome.changes.is_empty() {
        println!("{}", "No changes between result sets".dimmed());
        return Ok(());
    }

    let mut added = 0usize;
    let mut updated = 0usize;
    let mut deleted = 0usize;
    for change in &outcome.changes {
        match change {
            Change::Add { .. } => added += 1,
            Change::Update { .. } => updated += 1,
            Change::Delete { .. } => deleted += 1,
        }
        println!("{}", util::format_change(change, id_field));
    }

    println!();
    println!(
        "{}",
        format!(
            "Total: {} added, {} updated, {} deleted",
            added.to_string().green(),
            updated.to_string().yellow(),
            deleted.to_string().red()
        )
        .dimmed()
    );

    Ok(())
}
