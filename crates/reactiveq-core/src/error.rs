//! Error types for the reactiveq type engine.
//!
//! Router-level errors (missing reactors, handler failures) are defined in
//! `reactiveq-router`.

use thiserror::Error;

use crate::types::{TypeDescriptor, TypeVariable};

// =============================================================================
// Type Errors
// =============================================================================

/// Errors raised while turning a declared type shape into a canonical
/// [`TypeDescriptor`].
///
/// These are configuration errors: they surface at registration time, before
/// any reactor is stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A wildcard declared more than one upper or lower bound.
    #[error("wildcard declares {upper} upper and {lower} lower bounds; at most one of each is supported")]
    TooManyBounds {
        /// Number of declared upper bounds.
        upper: usize,
        /// Number of declared lower bounds.
        lower: usize,
    },

    /// A wildcard combined a lower bound with an upper bound other than `Object`.
    #[error("wildcard lower bound '{lower}' requires the universal upper bound, found '{upper}'")]
    MixedBounds {
        /// The offending upper bound.
        upper: TypeDescriptor,
        /// The lower bound.
        lower: TypeDescriptor,
    },

    /// A type variable survived resolution against its declaration context.
    #[error("type variable '{variable}' in '{descriptor}' could not be resolved")]
    UnresolvedVariable {
        /// The variable that could not be resolved.
        variable: TypeVariable,
        /// The descriptor that still contains it.
        descriptor: TypeDescriptor,
    },

    /// A parameterized type was applied to the wrong number of arguments.
    #[error("'{raw}' declares {expected} type parameter(s) but {found} argument(s) were supplied")]
    ArityMismatch {
        /// The raw type name.
        raw: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },
}

/// Result type for type-engine operations.
pub type TypeResult<T> = Result<T, TypeError>;
