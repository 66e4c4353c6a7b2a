//! Router bootstrap from configuration.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use reactiveq_runtime::ReactiveRuntime;
//!
//! // Loads reactiveq.toml from the current directory, if any
//! let runtime = ReactiveRuntime::new();
//!
//! // Or configure explicitly
//! let runtime = ReactiveRuntime::builder()
//!     .config_file("config/reactiveq.toml")
//!     .profile("production")
//!     .build()?;
//!
//! let _log = runtime.router().on_push(|line: &String| println!("{line}"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use reactiveq_core::TypeHierarchy;
use reactiveq_router::ReactorRouter;
use serde::Serialize;
use tracing::info;

use crate::config::{ConfigLoader, ReactiveqConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging::{self, LoggingBuilder};

/// A configured [`ReactorRouter`] with logging installed.
#[derive(Debug, Clone)]
pub struct ReactiveRuntime {
    config: ReactiveqConfig,
    router: ReactorRouter,
}

impl ReactiveRuntime {
    /// Loads configuration from the current directory and builds a runtime.
    ///
    /// Falls back to defaults if loading or validation fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .and_then(|config| validate_config(&config).map(|()| config))
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                ReactiveqConfig::default()
            });
        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Installs logging from `config` and builds the router.
    pub fn from_config(config: &ReactiveqConfig) -> Self {
        logging::init_from_config(&config.logging);
        Self::assemble(config.clone(), TypeHierarchy::with_builtins())
    }

    fn assemble(config: ReactiveqConfig, hierarchy: TypeHierarchy) -> Self {
        let router = ReactorRouter::with_hierarchy(hierarchy, config.router.to_options());
        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            router = ?config.router,
            "Runtime initialized from configuration"
        );
        Self { config, router }
    }

    /// Installs logging from the runtime's configuration, failing if a
    /// global subscriber is already set.
    pub fn init_logging(&self) -> RuntimeResult<()> {
        LoggingBuilder::from_config(&self.config.logging).try_init()?;
        Ok(())
    }

    pub fn config(&self) -> &ReactiveqConfig {
        &self.config
    }

    pub fn router(&self) -> &ReactorRouter {
        &self.router
    }

    pub fn into_router(self) -> ReactorRouter {
        self.router
    }
}

impl Default for ReactiveRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`ReactiveRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    hierarchy: Option<TypeHierarchy>,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            hierarchy: None,
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Replaces the built-in configuration defaults.
    pub fn merge(mut self, config: ReactiveqConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides one dotted configuration key.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Routes over `hierarchy` instead of the built-in one.
    pub fn hierarchy(mut self, hierarchy: TypeHierarchy) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates configuration, then builds the runtime.
    pub fn build(self) -> RuntimeResult<ReactiveRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        let hierarchy = self.hierarchy.unwrap_or_else(TypeHierarchy::with_builtins);
        Ok(ReactiveRuntime::assemble(config, hierarchy))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, LogOutput};
    use crate::error::RuntimeError;
    use figment::Jail;
    use reactiveq_core::{TypeDecl, TypeDescriptor};
    use reactiveq_router::RouterError;

    #[test]
    fn test_builder_applies_router_options() {
        Jail::expect_with(|jail| {
            jail.set_env("REACTIVEQ_ROUTER__CATCH_PANICS", "false");
            let runtime = ReactiveRuntime::builder()
                .search_path(jail.directory())
                .set("router.report_counts", false)
                .without_logging()
                .build()
                .unwrap();

            let options = runtime.router().options();
            assert!(!options.catch_panics);
            assert!(!options.report_counts);
            assert!(options.cache_matches);
            Ok(())
        });
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        Jail::expect_with(|jail| {
            let result = ReactiveRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .set("logging.output", LogOutput::File)
                .without_logging()
                .build();
            assert!(matches!(
                result,
                Err(RuntimeError::Config(ConfigError::Missing { .. }))
            ));
            Ok(())
        });
    }

    #[test]
    fn test_custom_hierarchy() {
        Jail::expect_with(|jail| {
            let hierarchy = TypeHierarchy::with_builtins();
            hierarchy.declare(TypeDecl::interface("Event"));

            let runtime = ReactiveRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .hierarchy(hierarchy)
                .without_logging()
                .build()
                .unwrap();

            let router = runtime.router();
            assert!(router.hierarchy().is_interface(&"Event".into()));
            assert!(router.hierarchy().contains(&"ReactorCount".into()));
            assert!(router.reactor_count(&TypeDescriptor::plain("Event")).is_none());
            Ok(())
        });
    }

    #[test]
    fn test_runtime_router_dispatches() {
        let runtime = ReactiveRuntime::from_config(&ReactiveqConfig::default());
        let router = runtime.clone().into_router();
        let _s = router.on_query(|n: &i64| n + 1).unwrap();

        let answers = runtime.router().query::<i64, i64>(41).unwrap();
        assert_eq!(answers[0].as_ref().ok(), Some(&42));
        assert!(matches!(
            runtime.router().push(1i64),
            Err(RouterError::NoReactors { .. })
        ));
    }
}
