//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Write configuration back out as TOML.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Apply `APP_*` overrides, then re-validate.
///
/// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("APP_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup("APP_LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(pattern) = lookup("APP_TEMPLATES_PATTERN") {
        config.templates.pattern = Some(pattern);
    }
    if let Some(max) = lookup("APP_RATE_LIMIT_MAX_REQUESTS") {
        match max.parse() {
            Ok(max) => {
                config.rate_limit.enabled = true;
                config.rate_limit.max_requests = max;
            }
            Err(_) => {
                return Err(ConfigError::Validation(vec![ValidationError {
                    field: "APP_RATE_LIMIT_MAX_REQUESTS".to_string(),
                    message: format!("`{max}` is not a number"),
                }]))
            }
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
