//! Runtime assignability between descriptors.
//!
//! `is_assignable(required, candidate)` answers whether a value described by
//! `candidate` may be delivered where `required` is expected:
//!
//! | required        | candidate       | rule                                          |
//! |-----------------|-----------------|-----------------------------------------------|
//! | `Object`        | anything        | always                                        |
//! | plain           | plain / generic | raw subtype                                   |
//! | generic         | plain / generic | raw subtype, then invariant arguments         |
//! | array           | array           | covariant components                          |
//! | wildcard        | anything        | within the upper bound and above the lower    |
//! | variable        | anything        | structurally identical only                   |

use tracing::trace;

use super::descriptor::{Parameterized, TypeDescriptor, Wildcard};
use super::hierarchy::TypeHierarchy;
use super::resolver::TypeResolver;

/// Decides assignability against a [`TypeHierarchy`].
#[derive(Debug, Clone, Copy)]
pub struct AssignabilityChecker<'h> {
    hierarchy: &'h TypeHierarchy,
}

impl<'h> AssignabilityChecker<'h> {
    pub fn new(hierarchy: &'h TypeHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Returns `true` if a `candidate` value may be used as `required`.
    pub fn is_assignable(&self, required: &TypeDescriptor, candidate: &TypeDescriptor) -> bool {
        use TypeDescriptor as D;

        if required == candidate {
            return true;
        }

        match (required, candidate) {
            (D::Variable(_), _) | (_, D::Variable(_)) => false,
            (D::Wildcard(w), _) => self.within_bounds(w, candidate),
            (D::Plain(key), _) if key.is_object() => true,
            // An unknown subtype of the upper bound.
            (_, D::Wildcard(w)) => self.is_assignable(required, w.upper()),
            (D::Plain(required), D::Plain(candidate)) => {
                self.hierarchy.is_subtype(candidate, required)
            }
            (D::Plain(required), D::Parameterized(candidate)) => {
                self.hierarchy.is_subtype(candidate.raw(), required)
            }
            (D::Parameterized(required), D::Plain(_) | D::Parameterized(_)) => {
                self.parameterized_accepts(required, candidate)
            }
            (D::ArrayOf(required), D::ArrayOf(candidate)) => {
                self.is_assignable(required, candidate)
            }
            (D::Plain(_) | D::Parameterized(_), D::ArrayOf(_)) | (D::ArrayOf(_), _) => false,
        }
    }

    fn within_bounds(&self, wildcard: &Wildcard, candidate: &TypeDescriptor) -> bool {
        self.is_assignable(wildcard.upper(), candidate)
            && wildcard
                .lower()
                .is_none_or(|lower| self.is_assignable(candidate, lower))
    }

    fn parameterized_accepts(&self, required: &Parameterized, candidate: &TypeDescriptor) -> bool {
        let Some(candidate_raw) = candidate.raw_key() else {
            return false;
        };
        if !self.hierarchy.is_subtype(candidate_raw, required.raw()) {
            return false;
        }

        let view = if candidate_raw == required.raw() {
            candidate.clone()
        } else {
            TypeResolver::new(self.hierarchy).resolve_supertype(
                candidate,
                candidate_raw,
                required.raw(),
            )
        };

        let TypeDescriptor::Parameterized(view) = &view else {
            trace!(
                required = %required.raw(),
                candidate = %candidate,
                "Raw candidate cannot satisfy type arguments"
            );
            return false;
        };

        if view.args().len() != required.args().len() {
            return false;
        }
        if let (Some(required_owner), Some(view_owner)) = (required.owner(), view.owner()) {
            if required_owner != view_owner {
                return false;
            }
        }

        required
            .args()
            .iter()
            .zip(view.args())
            .all(|(required, candidate)| self.argument_matches(required, candidate))
    }

    /// Type arguments are invariant unless the required argument is a wildcard.
    fn argument_matches(&self, required: &TypeDescriptor, candidate: &TypeDescriptor) -> bool {
        required == candidate
            || (matches!(required, TypeDescriptor::Wildcard(_))
                && self.is_assignable(required, candidate))
    }
}
