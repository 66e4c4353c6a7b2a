//! Error types for the router.

use std::error::Error as StdError;
use std::sync::Arc;

use reactiveq_core::{TypeDescriptor, TypeError};
use thiserror::Error;

use crate::reactor::Protocol;

/// Boxed error returned by fallible reactors.
pub type BoxError = Box<dyn StdError + Send + Sync>;

// =============================================================================
// Router Errors
// =============================================================================

/// Errors returned by registration and dispatch.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// No registered reactor matched a dispatched value. This is a wiring
    /// mistake and is never retried.
    #[error("no {protocol} reactor registered for '{descriptor}'")]
    NoReactors {
        /// The dispatch protocol.
        protocol: Protocol,
        /// The dispatched (push, query) or requested (pull) type.
        descriptor: TypeDescriptor,
    },

    /// Push reactors matched, but none of them had a view of the value.
    #[error("pushed '{descriptor}' matched {skipped} reactor(s) but none could view it")]
    Undelivered {
        descriptor: TypeDescriptor,
        skipped: usize,
    },

    /// A declared type could not be turned into a routable descriptor.
    #[error("invalid reactor type: {0}")]
    Type(#[from] TypeError),
}

impl RouterError {
    /// Returns `true` for [`RouterError::NoReactors`].
    pub fn is_no_reactors(&self) -> bool {
        matches!(self, Self::NoReactors { .. })
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

// =============================================================================
// Reactor Errors
// =============================================================================

/// Failure of a single pull or query reactor.
///
/// One reactor failing never prevents its siblings from producing results.
#[derive(Debug, Clone, Error)]
pub enum ReactorError {
    /// The reactor returned an error.
    #[error("reactor failed: {0}")]
    Failed(Arc<dyn StdError + Send + Sync>),

    /// The reactor panicked; carries the panic message.
    #[error("reactor panicked: {0}")]
    Panicked(String),

    /// A value could not be viewed as the Rust type the caller asked for.
    #[error("'{descriptor}' value of type {actual} cannot be viewed as {expected}")]
    ViewUnavailable {
        /// Descriptor of the produced or queried value.
        descriptor: TypeDescriptor,
        /// Rust type actually carried.
        actual: &'static str,
        /// Rust type requested.
        expected: &'static str,
    },
}

impl ReactorError {
    /// Wraps an arbitrary error.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(Arc::from(error.into()))
    }

    /// Builds a [`ReactorError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

/// Result of one pull or query reactor.
pub type ReactorResult<T> = Result<T, ReactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_keeps_message() {
        let error = ReactorError::failed("disk on fire");
        assert_eq!(error.to_string(), "reactor failed: disk on fire");
    }

    #[test]
    fn test_from_panic_payloads() {
        let error = ReactorError::from_panic(Box::new("static message"));
        assert!(matches!(error, ReactorError::Panicked(ref m) if m == "static message"));

        let error = ReactorError::from_panic(Box::new(String::from("owned message")));
        assert!(matches!(error, ReactorError::Panicked(ref m) if m == "owned message"));

        let error = ReactorError::from_panic(Box::new(42u8));
        assert!(matches!(error, ReactorError::Panicked(_)));
    }

    #[test]
    fn test_no_reactors_display() {
        let error = RouterError::NoReactors {
            protocol: Protocol::Pull,
            descriptor: TypeDescriptor::plain("String"),
        };
        assert!(error.is_no_reactors());
        assert_eq!(error.to_string(), "no pull reactor registered for 'String'");
    }
}
