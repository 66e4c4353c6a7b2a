//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogFormat, LogOutput, LoggingConfig, ReactiveqConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ReactiveqConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => return Err(ConfigError::missing("logging.file_path")),
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::invalid(format!(
                    "Log file path has no file name: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::invalid(
            "JSON log format requires the `json-log` feature",
        ));
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) || target.contains('=') {
            return Err(ConfigError::invalid(format!(
                "Invalid log filter target: {target:?}"
            )));
        }
    }

    Ok(())
}
