//! Bootstrap configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! This module owns the TOML tier. The per-setting resolution lives with the
//! tool that consumes the setting.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default REST API base URL
pub const DEFAULT_API_URL: &str = "https://api.cmsc.dev/v3";

/// Default AI completion endpoint base URL
pub const DEFAULT_AI_URL: &str = "https://workers.cmsc.dev/v3";

/// Default model identifier sent with completion requests
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// REST API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// AI completion endpoint base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_url: Option<String>,

    /// Slug of the bucket (target account) commands operate on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Bucket read key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_key: Option<String>,

    /// Bucket write key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_key: Option<String>,

    /// Backend-relative asset used when an image upload fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_asset: Option<String>,

    /// Model identifier for AI completions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get the default configuration file path for the platform
///
/// `<config_dir>/cmsc/config.toml`, e.g. `~/.config/cmsc/config.toml` on Linux.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("cmsc").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load TOML configuration from `path`
///
/// A missing file is not an error: it yields the all-defaults config.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;

    #[cfg(unix)]
    {
        if check_toml_permissions_loose(path)? {
            warn!(
                "Config file {} is readable by other users; it may contain API keys (chmod 600 recommended)",
                path.display()
            );
        }
    }

    Ok(config)
}

/// Write TOML configuration atomically
///
/// Serializes to `<path>.tmp`, restricts permissions to 0600 on Unix, then
/// renames over the target so readers never observe a partial file.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    debug!("Config written to {}", path.display());
    Ok(())
}

/// Whether the file grants any permission to group or other (Unix only)
#[cfg(unix)]
pub fn check_toml_permissions_loose(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(mode & 0o077 != 0)
}

/// Validate a key-like setting (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
