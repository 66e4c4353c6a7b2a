//! # reactiveq
//!
//! Type-directed, in-process routing of values to reactors.
//!
//! ## Overview
//!
//! Reactors register for a type and a protocol. Values are routed by runtime
//! type, honouring subtyping and generic arguments:
//!
//! ```text
//! ┌──────────┐     ┌───────────────┐     ┌─────────────────────────────┐
//! │  caller  │────▶│ ReactorRouter │────▶│ push reactor  (CharSequence) │
//! │ (String) │     │               │────▶│ push reactor  (String)       │
//! └──────────┘     └───────────────┘────▶│ push reactor  (Object)       │
//!                                        └─────────────────────────────┘
//! ```
//!
//! - **Core**: type descriptors, hierarchy, assignability, detachable storage
//! - **Router**: push, pull and query dispatch with detachable subscriptions
//! - **Runtime**: configuration and logging bootstrap
//!
//! ## Quick Start
//!
//! ```rust
//! use reactiveq::prelude::*;
//!
//! let router = ReactorRouter::new();
//! let _upper = router.on_query(|s: &String| s.to_uppercase()).unwrap();
//! let _counts = router
//!     .on_reactor_count(|count: &ReactorCount| println!("{} -> {}", count.descriptor, count.total))
//!     .unwrap();
//!
//! let answers = router.pull::<String>().with_query("value".to_string()).unwrap();
//! assert_eq!(answers[0].as_deref().ok(), Some("VALUE"));
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use reactiveq_core as core;
pub use reactiveq_router as router;
pub use reactiveq_runtime as runtime;

/// Commonly used types.
///
/// ```rust
/// use reactiveq::prelude::*;
/// ```
pub mod prelude {
    // Runtime - configured entry point
    pub use reactiveq_runtime::ReactiveRuntime;

    // Router
    pub use reactiveq_router::{
        OutcomeExt, ReactorCount, ReactorError, ReactorResult, ReactorRouter, RouterError,
        RouterOptions, RouterResult, Shape, Subscription,
    };

    // Values and types
    pub use reactiveq_core::{
        CharSequence, Detach, Number, Payload, RawType, Reflect, TypeDecl, TypeDescriptor,
        reflect_type, upcast_as,
    };
}
