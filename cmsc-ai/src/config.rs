//! Configuration resolution
//!
//! Each setting resolves independently with priority
//! command line → environment → TOML → built-in default.

use crate::error::InstallError;
use crate::installer::InstallSettings;
use crate::services::GatewaySettings;
use cmsc_common::config::{is_valid_key, TomlConfig, DEFAULT_AI_URL, DEFAULT_API_URL, DEFAULT_MODEL};
use tracing::{debug, warn};

pub const ENV_API_URL: &str = "CMSC_API_URL";
pub const ENV_AI_URL: &str = "CMSC_AI_URL";
pub const ENV_BUCKET: &str = "CMSC_BUCKET";
pub const ENV_READ_KEY: &str = "CMSC_READ_KEY";
pub const ENV_WRITE_KEY: &str = "CMSC_WRITE_KEY";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub bucket: Option<String>,
    pub model: Option<String>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub ai_url: String,
    pub bucket: Option<String>,
    pub read_key: Option<String>,
    pub write_key: Option<String>,
    pub default_asset: Option<String>,
    pub model: String,
}

impl Settings {
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        let api_url = resolve_setting(
            "API URL",
            cli.api_url.as_deref(),
            Some(ENV_API_URL),
            toml.api_url.as_deref(),
        )
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let ai_url = resolve_setting("AI URL", None, Some(ENV_AI_URL), toml.ai_url.as_deref())
            .unwrap_or_else(|| DEFAULT_AI_URL.to_string());

        let bucket = resolve_setting(
            "bucket",
            cli.bucket.as_deref(),
            Some(ENV_BUCKET),
            toml.bucket.as_deref(),
        );
        let read_key = resolve_setting("read key", None, Some(ENV_READ_KEY), toml.read_key.as_deref());
        let write_key =
            resolve_setting("write key", None, Some(ENV_WRITE_KEY), toml.write_key.as_deref());

        let model = resolve_setting("model", cli.model.as_deref(), None, toml.model.as_deref())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            api_url,
            ai_url,
            bucket,
            read_key,
            write_key,
            default_asset: toml.default_asset.clone().filter(|a| is_valid_key(a)),
            model,
        }
    }

    /// Selected bucket, or the setup failure for "no target"
    pub fn require_bucket(&self) -> Result<&str, InstallError> {
        self.bucket.as_deref().ok_or(InstallError::NoTarget)
    }

    pub fn gateway_settings(&self) -> Result<GatewaySettings, InstallError> {
        let mut settings = GatewaySettings::new(&self.api_url, self.require_bucket()?);
        settings.read_key = self.read_key.clone();
        settings.write_key = self.write_key.clone();
        Ok(settings)
    }

    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            default_asset: self.default_asset.clone(),
            ..InstallSettings::default()
        }
    }
}

/// Resolve one setting, warning when several sources provide it
fn resolve_setting(
    name: &str,
    cli: Option<&str>,
    env_var: Option<&str>,
    toml: Option<&str>,
) -> Option<String> {
    let env_value = env_var.and_then(|var| std::env::var(var).ok());

    let candidates = [
        ("command line", cli),
        ("environment", env_value.as_deref()),
        ("TOML", toml),
    ];
    let valid: Vec<(&str, &str)> = candidates
        .into_iter()
        .filter_map(|(source, value)| value.filter(|v| is_valid_key(v)).map(|v| (source, v)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {}.",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    valid.first().map(|(source, value)| {
        debug!(setting = %name, source = %source, "Resolved setting");
        value.trim().to_string()
    })
}
