//! The runtime type engine.
//!
//! - [`TypeDescriptor`] - canonical, structural type values
//! - [`RawType`] - declared shapes and their canonicalization
//! - [`TypeHierarchy`] - the declared subtype graph
//! - [`TypeResolver`] - type-variable substitution along supertype chains
//! - [`AssignabilityChecker`] - "may a value of this type be delivered there?"

mod assignability;
mod descriptor;
mod hierarchy;
mod raw;
mod resolver;

pub use assignability::AssignabilityChecker;
pub use descriptor::{OBJECT, Parameterized, TypeDescriptor, TypeKey, TypeVariable, Wildcard};
pub use hierarchy::{TypeDecl, TypeHierarchy, TypeKind, builtin};
pub use raw::RawType;
pub use resolver::TypeResolver;
