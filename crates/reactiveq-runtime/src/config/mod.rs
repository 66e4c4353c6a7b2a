//! Configuration for the reactiveq runtime.
//!
//! Router options and logging setup are loaded from layered sources (files,
//! environment, code) and validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ReactiveqConfig, RouterConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
