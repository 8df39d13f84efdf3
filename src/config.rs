use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Client configuration, loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the analysis service.
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,
    /// Directory exported reports are written into.
    pub report_output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_seconds: 30,
            report_output_dir: ".".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file '{path}'"))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file '{path}'"))?;
        Ok(())
    }

    /// Loads the file when it exists, otherwise falls back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            log::warn!("Configuration file '{path}' not found, using default configuration");
            Ok(Self::default())
        }
    }
}
