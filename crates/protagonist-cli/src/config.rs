use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Settings read from a `--config` file. Command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub workers: Option<usize>,
    /// Parse options object passed to every call.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl CliConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let config = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&config)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}
