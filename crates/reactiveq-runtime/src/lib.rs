//! reactiveq Runtime - configuration and bootstrap for the reactiveq router.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `ReactiveqConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - A configured router (`ReactiveRuntime`)
//!
//! # Configuration File
//!
//! ```toml
//! [router]
//! cache_matches = true
//! report_counts = true
//! catch_panics = true
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! output = "stdout"
//!
//! [logging.filters]
//! reactiveq_router = "debug"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use reactiveq_runtime::ReactiveRuntime;
//!
//! let runtime = ReactiveRuntime::builder().profile("production").build()?;
//! let router = runtime.router();
//!
//! let _greeting = router.on_pull(|| "hello".to_string())?;
//! for value in router.pull::<String>().fetch()? {
//!     println!("{value:?}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, ReactiveqConfig, RouterConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ReactiveRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
