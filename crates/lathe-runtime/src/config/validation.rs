//! Semantic checks serde cannot express.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LatheConfig, LogFormat, LogOutput};

/// Validates the entire configuration.
pub fn validate_config(config: &LatheConfig) -> ConfigResult<()> {
    let logging = &config.logging;
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing("logging.file_path"));
    }
    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::invalid(
            "logging.format",
            "`json` requires the json-log feature",
        ));
    }

    let api = &config.api;
    if api.base_url.is_empty() {
        return Err(ConfigError::missing("api.base_url"));
    }
    if !["http://", "https://"]
        .iter()
        .any(|scheme| api.base_url.starts_with(scheme))
    {
        return Err(ConfigError::invalid(
            "api.base_url",
            format!("must be an http(s) URL, got {:?}", api.base_url),
        ));
    }
    if api.version.trim().is_empty() {
        return Err(ConfigError::missing("api.version"));
    }
    if api.timeout_ms == 0 {
        return Err(ConfigError::invalid("api.timeout_ms", "must be greater than 0"));
    }

    if config.runtime.shutdown_timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "runtime.shutdown_timeout_ms",
            "must be greater than 0",
        ));
    }

    Ok(())
}
