use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Global svnfix configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Explicit path to TortoiseProc, tried before the registry
    #[serde(default)]
    pub repair_tool: Option<PathBuf>,

    /// Wait for a key press before the console closes
    #[serde(default = "default_true")]
    pub pause_on_exit: bool,

    /// Write a daily log file under the data directory
    #[serde(default = "default_true")]
    pub log_to_file: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repair_tool: None,
            pause_on_exit: default_true(),
            log_to_file: default_true(),
        }
    }
}

impl Config {
    /// Get the svnfix data directory (~/.svnfix)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".svnfix")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Get the logs directory
    pub fn logs_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    /// Load config from the default location, or defaults if it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&contents).map_err(|e| {
            crate::common::errors::FixError::Config {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            }
        })?;
        Ok(config)
    }

    /// The configured repair tool, with a command-line value taking precedence
    pub fn repair_tool_override(&self, cli_value: Option<&Path>) -> Option<PathBuf> {
        cli_value
            .map(Path::to_path_buf)
            .or_else(|| self.repair_tool.clone())
    }
}
