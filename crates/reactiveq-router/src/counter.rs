//! Reactor-count notifications.
//!
//! Whenever a reactor is attached to or detached from a bucket, the router
//! pushes a [`ReactorCount`] for that bucket through itself. Buckets whose key
//! is a subtype of the `Unreported` marker are left out, which includes
//! `ReactorCount` itself.

use reactiveq_core::types::builtin::UNREPORTED;
use reactiveq_core::{RawType, Reflect, TypeDecl, TypeDescriptor, TypeHierarchy, TypeKey};

/// Declared name of [`ReactorCount`].
pub const REACTOR_COUNT: &str = "ReactorCount";

/// Number of reactors registered in one bucket, per protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorCount {
    /// The bucket key.
    pub descriptor: TypeDescriptor,
    pub push: usize,
    pub pull: usize,
    pub query: usize,
    /// `push + pull + query`.
    pub total: usize,
}

impl ReactorCount {
    pub fn new(descriptor: TypeDescriptor, push: usize, pull: usize, query: usize) -> Self {
        Self {
            descriptor,
            push,
            pull,
            query,
            total: push + pull + query,
        }
    }
}

impl Reflect for ReactorCount {
    fn raw_type() -> RawType {
        RawType::named(REACTOR_COUNT)
    }
}

pub(crate) fn declare_reactor_count(hierarchy: &TypeHierarchy) {
    hierarchy.declare(TypeDecl::class(REACTOR_COUNT).implements(TypeDescriptor::plain(UNREPORTED)));
}

/// Returns `true` if counts for a bucket keyed by `descriptor` are published.
pub(crate) fn is_reported(hierarchy: &TypeHierarchy, descriptor: &TypeDescriptor) -> bool {
    let unreported = TypeKey::new(UNREPORTED);
    match descriptor.raw_key() {
        Some(key) if !key.is_object() => !hierarchy.is_subtype(key, &unreported),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total() {
        let count = ReactorCount::new(TypeDescriptor::plain("String"), 2, 1, 3);
        assert_eq!(count.total, 6);
    }

    #[test]
    fn test_reporting_exclusions() {
        let hierarchy = TypeHierarchy::with_builtins();
        declare_reactor_count(&hierarchy);
        hierarchy.declare(TypeDecl::class("Heartbeat").implements(TypeDescriptor::plain(UNREPORTED)));

        assert!(!is_reported(&hierarchy, &TypeDescriptor::plain(REACTOR_COUNT)));
        assert!(!is_reported(&hierarchy, &TypeDescriptor::plain("Heartbeat")));
        assert!(is_reported(&hierarchy, &TypeDescriptor::plain("String")));
        assert!(is_reported(&hierarchy, &TypeDescriptor::object()));
        assert!(is_reported(
            &hierarchy,
            &TypeDescriptor::array_of(TypeDescriptor::plain(REACTOR_COUNT))
        ));
    }
}
