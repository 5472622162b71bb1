//! Watch configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Defaults for `rq watch`, loadable from a TOML file.
///
/// Command-line flags always take precedence over file values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Identity field joining rows between successive snapshots
    pub id_field: String,

    /// Polling interval in milliseconds
    pub interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            interval_ms: 2000,
        }
    }
}

impl WatchConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
