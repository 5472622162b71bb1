//! Requery CLI - rq command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod source;
mod util;

/// Requery - ordered result-set reconciliation for polled queries
#[derive(Parser)]
#[command(name = "rq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two JSON result sets and print the change events
    Diff {
        /// Prior result set (JSON array of objects)
        old: PathBuf,
        /// New result set (JSON array of objects)
        new: PathBuf,
        /// Identity field joining rows between the two sets
        #[arg(long, default_value = "id")]
        id_field: String,
        /// Absolute index of the first row (for page-relative inputs)
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Emit change events as JSON lines instead of a colored listing
        #[arg(long)]
        json: bool,
    },
    /// Poll a JSON result set and stream change events as it evolves
    Watch {
        /// Result set document to poll (JSON array of objects)
        source: PathBuf,
        /// Identity field joining rows between successive snapshots
        #[arg(long)]
        id_field: Option<String>,
        /// Polling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Emit change events as JSON lines instead of a colored listing
        #[arg(long)]
        json: bool,
        /// TOML config file with watch defaults; flags take precedence
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Diff { old, new, id_field, offset, json } => {
            cmd::diff::run(&old, &new, &id_field, offset, json).await
        }
        Commands::Watch { source, id_field, interval_ms, json, config } => {
            cmd::watch::run(&source, id_field, interval_ms, json, config.as_deref()).await
        }
    }
}
