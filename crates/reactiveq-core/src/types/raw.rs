//! Declared (non-canonical) type shapes and their canonicalization.
//!
//! A [`RawType`] is what a caller writes down: it may spell the same type in
//! several ways (a native array versus a generic array of the same component,
//! a wildcard with an explicit `Object` bound, and so on). [`RawType::canonicalize`]
//! maps every spelling onto the single [`TypeDescriptor`] the router keys by.

use super::descriptor::{TypeDescriptor, TypeKey, TypeVariable};
use crate::error::{TypeError, TypeResult};

/// A type shape as declared by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawType {
    /// A named, non-generic type (or a generic type used raw).
    Named(TypeKey),
    /// A native array, e.g. `[i32; 4]`.
    Array(Box<RawType>),
    /// A generic array, e.g. `Vec<T>`.
    GenericArray(Box<RawType>),
    /// A generic type applied to arguments.
    Parameterized {
        /// Enclosing type for member types.
        owner: Option<Box<RawType>>,
        /// The raw generic type.
        raw: TypeKey,
        /// Type arguments in declaration order.
        args: Vec<RawType>,
    },
    /// A wildcard with any number of declared bounds.
    Wildcard {
        /// Declared upper bounds; empty means `Object`.
        upper: Vec<RawType>,
        /// Declared lower bounds.
        lower: Vec<RawType>,
    },
    /// A type parameter.
    Variable(TypeVariable),
    /// An already canonical descriptor embedded in a larger shape.
    Canonical(TypeDescriptor),
}

impl RawType {
    pub fn named(name: impl Into<TypeKey>) -> Self {
        Self::Named(name.into())
    }

    pub fn array_of(component: RawType) -> Self {
        Self::Array(Box::new(component))
    }

    pub fn generic_array_of(component: RawType) -> Self {
        Self::GenericArray(Box::new(component))
    }

    pub fn parameterized(raw: impl Into<TypeKey>, args: impl IntoIterator<Item = RawType>) -> Self {
        Self::Parameterized {
            owner: None,
            raw: raw.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Sets the owner of a parameterized shape. Other shapes are returned as is.
    pub fn with_owner(self, owner: RawType) -> Self {
        match self {
            Self::Parameterized { raw, args, .. } => Self::Parameterized {
                owner: Some(Box::new(owner)),
                raw,
                args,
            },
            other => other,
        }
    }

    /// `? extends bound`.
    pub fn subtype_of(bound: RawType) -> Self {
        Self::Wildcard {
            upper: vec![bound],
            lower: Vec::new(),
        }
    }

    /// `? super bound`.
    pub fn supertype_of(bound: RawType) -> Self {
        Self::Wildcard {
            upper: vec![RawType::named(super::descriptor::OBJECT)],
            lower: vec![bound],
        }
    }

    /// `?`.
    pub fn unbounded() -> Self {
        Self::Wildcard {
            upper: Vec::new(),
            lower: Vec::new(),
        }
    }

    pub fn variable(name: &str, declared_by: impl Into<TypeKey>) -> Self {
        Self::Variable(TypeVariable::new(name, declared_by))
    }

    /// Rewrites this shape into its canonical descriptor.
    ///
    /// Fails when a wildcard declares more than one bound on either side, or a
    /// lower bound together with an upper bound other than `Object`.
    pub fn canonicalize(&self) -> TypeResult<TypeDescriptor> {
        match self {
            Self::Named(key) => Ok(TypeDescriptor::Plain(key.clone())),
            Self::Array(component) | Self::GenericArray(component) => {
                Ok(TypeDescriptor::array_of(component.canonicalize()?))
            }
            Self::Parameterized { owner, raw, args } => {
                let owner = owner.as_deref().map(RawType::canonicalize).transpose()?;
                let args = args
                    .iter()
                    .map(RawType::canonicalize)
                    .collect::<TypeResult<Vec<_>>>()?;
                Ok(TypeDescriptor::parameterized_with_owner(owner, raw.clone(), args))
            }
            Self::Wildcard { upper, lower } => canonical_wildcard(upper, lower),
            Self::Variable(variable) => Ok(TypeDescriptor::Variable(variable.clone())),
            Self::Canonical(descriptor) => Ok(descriptor.clone()),
        }
    }
}

fn canonical_wildcard(upper: &[RawType], lower: &[RawType]) -> TypeResult<TypeDescriptor> {
    if upper.len() > 1 || lower.len() > 1 {
        return Err(TypeError::TooManyBounds {
            upper: upper.len(),
            lower: lower.len(),
        });
    }

    let upper = match upper.first() {
        Some(bound) => bound.canonicalize()?,
        None => TypeDescriptor::object(),
    };

    match lower.first() {
        Some(bound) => {
            let lower = bound.canonicalize()?;
            if !upper.is_object() {
                return Err(TypeError::MixedBounds { upper, lower });
            }
            Ok(TypeDescriptor::supertype_of(lower))
        }
        None => Ok(TypeDescriptor::subtype_of(upper)),
    }
}

impl From<TypeDescriptor> for RawType {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::Canonical(descriptor)
    }
}

impl From<TypeKey> for RawType {
    fn from(key: TypeKey) -> Self {
        Self::Named(key)
    }
}

impl From<&str> for RawType {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}
