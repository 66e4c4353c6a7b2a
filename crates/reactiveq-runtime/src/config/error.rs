//! Errors raised while loading or checking a [`ReactiveqConfig`](super::ReactiveqConfig).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Config file `{0}` does not exist")]
    FileNotFound(PathBuf),

    /// The file extension is unknown or its format feature is disabled.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// A source could not be read or did not match the schema.
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] figment::Error),

    #[error("Rejected configuration: {message}")]
    Invalid { message: String },

    /// A key that another setting depends on is unset.
    #[error("`{key}` must be set")]
    Missing { key: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
