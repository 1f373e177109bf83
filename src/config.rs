use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Preferred config file name
pub const CONFIG_TOML: &str = "config.toml";

/// Fallback config file name
pub const CONFIG_JSON: &str = "config.json";

/// When to emit ANSI colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when writing to a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Apply to the process-wide `colored` switch
    pub fn apply(self) {
        match self {
            Self::Auto => colored::control::unset_override(),
            Self::Always => colored::control::set_override(true),
            Self::Never => colored::control::set_override(false),
        }
    }
}

/// How secret property values are displayed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsMode {
    #[default]
    Mask,
    Reveal,
}

/// Top-level stackview config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
}

/// `[display]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show resources without changes
    pub show_unchanged: bool,
    /// Rows per frame
    pub viewport_height: usize,
    pub color: ColorMode,
    pub secrets: SecretsMode,
    /// Event log used when no path is given on the command line
    pub event_log: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_unchanged: false,
            viewport_height: 30,
            color: ColorMode::Auto,
            secrets: SecretsMode::Mask,
            event_log: None,
        }
    }
}

impl Config {
    /// Load from the config directory, or defaults if there is no config file
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_dir()?)
    }

    /// Load `config.toml`, falling back to `config.json`, from `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let toml_path = dir.join(CONFIG_TOML);
        if toml_path.exists() {
            let content = fs::read_to_string(&toml_path)
                .with_context(|| format!("Could not read {}", toml_path.display()))?;
            let config = toml::from_str(&content)
                .with_context(|| format!("Invalid TOML format in {}", toml_path.display()))?;
            log::debug!("Loaded config from {}", toml_path.display());
            return Ok(config);
        }

        let json_path = dir.join(CONFIG_JSON);
        if json_path.exists() {
            let content = fs::read_to_string(&json_path)
                .with_context(|| format!("Could not read {}", json_path.display()))?;
            let config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON format in {}", json_path.display()))?;
            log::debug!("Loaded config from {}", json_path.display());
            return Ok(config);
        }

        log::debug!("No config file in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    /// Configured default event log, expanded
    pub fn event_log_path(&self) -> Option<PathBuf> {
        self.display
            .event_log
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(paths::expand)
    }

    pub fn reveal_secrets(&self) -> bool {
        self.display.secrets == SecretsMode::Reveal
    }
}
