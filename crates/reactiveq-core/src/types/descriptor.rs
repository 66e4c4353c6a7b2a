//! Canonical, structural type descriptors.
//!
//! A [`TypeDescriptor`] is the value the router keys its buckets by. Two
//! descriptors denoting the same type shape compare equal and hash identically
//! no matter how they were built, so descriptors can be used as map keys and
//! interned freely.
//!
//! Descriptors are cheap to clone: nested nodes are shared through `Arc`.
//!
//! # Example
//!
//! ```rust
//! use reactiveq_core::types::TypeDescriptor;
//!
//! let a = TypeDescriptor::parameterized("List", [TypeDescriptor::plain("String")]);
//! let b = TypeDescriptor::parameterized("List", vec![TypeDescriptor::plain("String")]);
//! assert_eq!(a, b);
//! assert_eq!(a.to_string(), "List<String>");
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

/// Name of the universal top type.
pub const OBJECT: &str = "Object";

static OBJECT_KEY: LazyLock<TypeKey> = LazyLock::new(|| TypeKey::new(OBJECT));

// ============================================================================
// Type Keys
// ============================================================================

/// The identity of a declared (non-generic or raw generic) type.
///
/// Keys are compared by name; the name is the only identity a type has.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    /// Creates a key for the given type name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The key of the universal top type.
    pub fn object() -> Self {
        OBJECT_KEY.clone()
    }

    /// Returns `true` if this is the universal top type.
    pub fn is_object(&self) -> bool {
        &*self.0 == OBJECT
    }

    /// Returns the type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.0)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Type Variables
// ============================================================================

/// An unresolved type parameter such as the `E` of `List<E>`.
///
/// `declared_by` is the type whose parameter list introduces the variable. A
/// variable without a known declaring type can never be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVariable {
    name: Arc<str>,
    declared_by: Option<TypeKey>,
}

impl TypeVariable {
    /// Creates a variable declared by `declared_by`.
    pub fn new(name: impl Into<Arc<str>>, declared_by: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            declared_by: Some(declared_by.into()),
        }
    }

    /// Creates a variable whose declaring type is unknown.
    pub fn orphan(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            declared_by: None,
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declaring type, if known.
    pub fn declared_by(&self) -> Option<&TypeKey> {
        self.declared_by.as_ref()
    }
}

impl fmt::Display for TypeVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Descriptor Nodes
// ============================================================================

/// A generic type applied to arguments, e.g. `Map<String, Int>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameterized {
    raw: TypeKey,
    owner: Option<TypeDescriptor>,
    args: Vec<TypeDescriptor>,
}

impl Parameterized {
    /// The raw generic type.
    pub fn raw(&self) -> &TypeKey {
        &self.raw
    }

    /// The enclosing type for member types.
    pub fn owner(&self) -> Option<&TypeDescriptor> {
        self.owner.as_ref()
    }

    /// Type arguments in declaration order.
    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }
}

/// A wildcard bound such as `? extends Number` or `? super Int`.
///
/// Invariant: when `lower` is present, `upper` is the universal top type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wildcard {
    upper: TypeDescriptor,
    lower: Option<TypeDescriptor>,
}

impl Wildcard {
    /// The upper bound (`Object` when unbounded).
    pub fn upper(&self) -> &TypeDescriptor {
        &self.upper
    }

    /// The lower bound, if any.
    pub fn lower(&self) -> Option<&TypeDescriptor> {
        self.lower.as_ref()
    }

    /// Returns `true` for the unbounded wildcard `?`.
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_object()
    }
}

/// The canonical representation of a (possibly generic) type.
///
/// Built either through the constructors below (which always produce canonical
/// values) or by canonicalizing a [`RawType`](super::RawType).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A concrete, non-generic type (or a generic type used raw).
    Plain(TypeKey),
    /// A generic type applied to type arguments.
    Parameterized(Arc<Parameterized>),
    /// An array of the component type.
    ArrayOf(Arc<TypeDescriptor>),
    /// A wildcard bound.
    Wildcard(Arc<Wildcard>),
    /// An unresolved type parameter.
    Variable(TypeVariable),
}

impl TypeDescriptor {
    /// A plain type.
    pub fn plain(key: impl Into<TypeKey>) -> Self {
        Self::Plain(key.into())
    }

    /// The universal top type.
    pub fn object() -> Self {
        Self::Plain(TypeKey::object())
    }

    /// A parameterized type without an owner.
    pub fn parameterized(
        raw: impl Into<TypeKey>,
        args: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Self {
        Self::parameterized_with_owner(None, raw, args)
    }

    /// A parameterized member type enclosed by `owner`.
    pub fn parameterized_with_owner(
        owner: Option<TypeDescriptor>,
        raw: impl Into<TypeKey>,
        args: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Self {
        Self::Parameterized(Arc::new(Parameterized {
            raw: raw.into(),
            owner,
            args: args.into_iter().collect(),
        }))
    }

    /// An array whose elements are all of `component`.
    pub fn array_of(component: TypeDescriptor) -> Self {
        Self::ArrayOf(Arc::new(component))
    }

    /// The unbounded wildcard `?`.
    pub fn unbounded() -> Self {
        Self::Wildcard(Arc::new(Wildcard {
            upper: Self::object(),
            lower: None,
        }))
    }

    /// `? extends bound`. A wildcard bound is flattened to its own upper bound.
    pub fn subtype_of(bound: TypeDescriptor) -> Self {
        let upper = match bound {
            Self::Wildcard(w) => w.upper.clone(),
            other => other,
        };
        Self::Wildcard(Arc::new(Wildcard { upper, lower: None }))
    }

    /// `? super bound`. A wildcard bound contributes its own lower bound.
    pub fn supertype_of(bound: TypeDescriptor) -> Self {
        let lower = match bound {
            Self::Wildcard(w) => w.lower.clone(),
            other => Some(other),
        };
        Self::Wildcard(Arc::new(Wildcard {
            upper: Self::object(),
            lower,
        }))
    }

    /// A type variable declared by `declared_by`.
    pub fn variable(name: impl Into<Arc<str>>, declared_by: impl Into<TypeKey>) -> Self {
        Self::Variable(TypeVariable::new(name, declared_by))
    }

    /// Returns `true` if this is the universal top type.
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Plain(key) if key.is_object())
    }

    /// The erased raw type.
    ///
    /// Wildcards erase to their upper bound and variables to `Object`. Arrays
    /// have no raw key of their own.
    pub fn raw_key(&self) -> Option<&TypeKey> {
        match self {
            Self::Plain(key) => Some(key),
            Self::Parameterized(p) => Some(&p.raw),
            Self::Wildcard(w) => w.upper.raw_key(),
            Self::Variable(_) => Some(&*OBJECT_KEY),
            Self::ArrayOf(_) => None,
        }
    }

    /// Type arguments of a parameterized descriptor; empty otherwise.
    pub fn args(&self) -> &[TypeDescriptor] {
        match self {
            Self::Parameterized(p) => &p.args,
            _ => &[],
        }
    }

    /// The first unresolved variable found in a depth-first walk, if any.
    pub fn first_variable(&self) -> Option<&TypeVariable> {
        match self {
            Self::Plain(_) => None,
            Self::Variable(v) => Some(v),
            Self::ArrayOf(component) => component.first_variable(),
            Self::Parameterized(p) => p
                .owner
                .as_ref()
                .and_then(TypeDescriptor::first_variable)
                .or_else(|| p.args.iter().find_map(TypeDescriptor::first_variable)),
            Self::Wildcard(w) => w
                .upper
                .first_variable()
                .or_else(|| w.lower.as_ref().and_then(TypeDescriptor::first_variable)),
        }
    }

    /// Returns `true` if no unresolved variable remains anywhere in the tree.
    pub fn is_concrete(&self) -> bool {
        self.first_variable().is_none()
    }
}

impl From<TypeKey> for TypeDescriptor {
    fn from(key: TypeKey) -> Self {
        Self::Plain(key)
    }
}

impl From<TypeVariable> for TypeDescriptor {
    fn from(variable: TypeVariable) -> Self {
        Self::Variable(variable)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(key) => write!(f, "{key}"),
            Self::Parameterized(p) => {
                if let Some(owner) = &p.owner {
                    write!(f, "{owner}.")?;
                }
                write!(f, "{}", p.raw)?;
                if !p.args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in p.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::ArrayOf(component) => write!(f, "{component}[]"),
            Self::Wildcard(w) => match &w.lower {
                Some(lower) => write!(f, "? super {lower}"),
                None if w.upper.is_object() => f.write_str("?"),
                None => write!(f, "? extends {}", w.upper),
            },
            Self::Variable(v) => write!(f, "{v}"),
        }
    }
}
