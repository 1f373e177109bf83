//! Config path resolution for stackview
//!
//! # Environment Variables
//!
//! - `STACKVIEW_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/stackview`)
//!
//! # Path Resolution Priority
//!
//! 1. `STACKVIEW_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/stackview` (if set)
//! 3. `~/.config/stackview`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "STACKVIEW_CONFIG_DIR";

const APP_DIR: &str = "stackview";

/// Get the stackview config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path
///
/// If a variable is unset the path is returned as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
