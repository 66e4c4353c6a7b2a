//! # reactiveq Core
//!
//! The runtime type engine and storage primitives behind the reactiveq router.
//!
//! ## Type Engine
//!
//! - **Descriptors**: canonical, structural type values ([`TypeDescriptor`])
//! - **Declared shapes**: non-canonical input and canonicalization ([`RawType`])
//! - **Hierarchy**: the declared subtype graph ([`TypeHierarchy`])
//! - **Resolution**: type-variable substitution ([`TypeResolver`])
//! - **Assignability**: delivery compatibility ([`AssignabilityChecker`])
//!
//! ## Values
//!
//! - **Reflection**: Rust types declare their shape through [`Reflect`]
//! - **Payloads**: shared, type-erased values with descriptors ([`Payload`])
//!
//! ## Storage
//!
//! - **Registry**: ordered storage with O(1) detach ([`DetachableRegistry`])
//!
//! ## Example
//!
//! ```rust
//! use reactiveq_core::{AssignabilityChecker, TypeDescriptor, TypeHierarchy};
//!
//! let hierarchy = TypeHierarchy::with_builtins();
//! let checker = AssignabilityChecker::new(&hierarchy);
//!
//! let numbers = TypeDescriptor::array_of(TypeDescriptor::plain("Number"));
//! let ints = TypeDescriptor::array_of(TypeDescriptor::plain("Int"));
//! assert!(checker.is_assignable(&numbers, &ints));
//! ```

pub mod error;
pub mod payload;
pub mod reflect;
pub mod registry;
pub mod types;

pub use error::{TypeError, TypeResult};
pub use payload::Payload;
pub use reflect::{AnyValue, AsAny, CharSequence, DescriptorCache, Number, Reflect, upcast_as};
pub use registry::{Detach, DetachableHandle, DetachableRegistry};
pub use types::{
    AssignabilityChecker, RawType, TypeDecl, TypeDescriptor, TypeHierarchy, TypeKey, TypeKind,
    TypeResolver, TypeVariable,
};
