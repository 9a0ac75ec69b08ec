//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{BreakerConfig, RemediationKind};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variables that override file settings.
pub const ENV_MAX_EVENTS: &str = "MAX_EVENTS";
pub const ENV_TIME_FRAME_IN_SECONDS: &str = "TIME_FRAME_IN_SECONDS";
pub const ENV_NAMESPACE: &str = "NAMESPACE";
pub const ENV_REMEDIATION_KIND: &str = "REMEDIATION_KIND";
pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<BreakerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load, apply environment overrides and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BreakerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Like `load_config`, but starts from defaults when no file is given.
pub fn load(path: Option<&Path>) -> Result<BreakerConfig, ConfigError> {
    if let Some(path) = path {
        return load_config(path);
    }

    let mut config = BreakerConfig::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from `lookup` (normally `std::env::var`). Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut BreakerConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(value) = get(ENV_MAX_EVENTS) {
        config.threshold.max_events = parse_env(ENV_MAX_EVENTS, &value)?;
    }
    if let Some(value) = get(ENV_TIME_FRAME_IN_SECONDS) {
        config.threshold.window_secs = parse_env(ENV_TIME_FRAME_IN_SECONDS, &value)?;
    }
    if let Some(value) = get(ENV_NAMESPACE) {
        config.remediation.namespace = value.trim().to_string();
    }
    if let Some(value) = get(ENV_REMEDIATION_KIND) {
        config.remediation.kind = value.parse::<RemediationKind>().map_err(|_| ConfigError::Env {
            name: ENV_REMEDIATION_KIND,
            value,
        })?;
    }
    if let Some(value) = get(ENV_WEBHOOK_URL) {
        config.webhook.url = value.trim().to_string();
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
    })
}
