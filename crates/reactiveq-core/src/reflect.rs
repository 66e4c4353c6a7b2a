//! Runtime type information for Rust values.
//!
//! Rust values carry no inheritance graph, so every type that travels through
//! the router states its declared shape through [`Reflect::raw_type`]. A value
//! delivered to a reactor that expects one of its supertypes is viewed through
//! [`Reflect::upcast`], which builds an owned value of the supertype's Rust
//! representation.
//!
//! ```rust
//! use reactiveq_core::reflect::{CharSequence, Reflect};
//! use reactiveq_core::types::RawType;
//! use std::any::TypeId;
//!
//! assert_eq!(String::raw_type(), RawType::named("String"));
//!
//! let view = "hi".to_string().upcast(TypeId::of::<CharSequence>()).unwrap();
//! assert_eq!(view.downcast_ref::<CharSequence>().unwrap().as_str(), "hi");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::TypeResult;
use crate::types::{RawType, TypeDescriptor, builtin};

/// Owned, type-erased value produced by [`Reflect::upcast`].
pub type AnyValue = Box<dyn Any + Send + Sync>;

// ============================================================================
// Reflect
// ============================================================================

/// Erased access to `self`, so that `dyn Reflect` values can be downcast.
///
/// Implemented for every `'static + Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A value that can be routed by type.
pub trait Reflect: AsAny {
    /// The declared shape of this Rust type.
    fn raw_type() -> RawType
    where
        Self: Sized;

    /// Produces an owned view of `self` as the Rust type identified by
    /// `target`, or `None` if no such view exists.
    fn upcast(&self, target: TypeId) -> Option<AnyValue> {
        let _ = target;
        None
    }

    /// Rust type name, used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Builds an upcast view when `target` is `U`.
///
/// Intended for [`Reflect::upcast`] implementations:
///
/// ```rust,ignore
/// fn upcast(&self, target: TypeId) -> Option<AnyValue> {
///     upcast_as(target, || Shape::Circle(self.clone()))
/// }
/// ```
pub fn upcast_as<U: Any + Send + Sync>(
    target: TypeId,
    make: impl FnOnce() -> U,
) -> Option<AnyValue> {
    (target == TypeId::of::<U>()).then(|| Box::new(make()) as AnyValue)
}

/// Implements [`Reflect`] for a non-generic type declared under `name`.
///
/// Supertype views can be listed after `=>` as `Target: |value| expr` pairs.
///
/// ```rust,ignore
/// reflect_type!(Circle, "Circle");
/// reflect_type!(Square, "Square" => Shape: |s| Shape::Square(s.clone()));
/// ```
#[macro_export]
macro_rules! reflect_type {
    ($type:ty, $name:expr) => {
        impl $crate::reflect::Reflect for $type {
            fn raw_type() -> $crate::types::RawType {
                $crate::types::RawType::named($name)
            }
        }
    };
    ($type:ty, $name:expr => $($target:ty : $make:expr),+ $(,)?) => {
        impl $crate::reflect::Reflect for $type {
            fn raw_type() -> $crate::types::RawType {
                $crate::types::RawType::named($name)
            }

            fn upcast(
                &self,
                target: ::std::any::TypeId,
            ) -> Option<$crate::reflect::AnyValue> {
                $(
                    if let Some(view) = $crate::reflect::upcast_as::<$target>(target, || {
                        let make: fn(&$type) -> $target = $make;
                        make(self)
                    }) {
                        return Some(view);
                    }
                )+
                None
            }
        }
    };
}

// ============================================================================
// Built-in Views
// ============================================================================

/// Rust representation of the `CharSequence` interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharSequence(String);

impl CharSequence {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CharSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Reflect for CharSequence {
    fn raw_type() -> RawType {
        RawType::named(builtin::CHAR_SEQUENCE)
    }
}

/// Rust representation of the `Number` class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i32),
    Long(i64),
    Short(i16),
    Byte(i8),
    Float(f32),
    Double(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => f64::from(v),
            Self::Long(v) => v as f64,
            Self::Short(v) => f64::from(v),
            Self::Byte(v) => f64::from(v),
            Self::Float(v) => f64::from(v),
            Self::Double(v) => v,
        }
    }

    /// Integral value, truncating floating-point variants.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int(v) => i64::from(v),
            Self::Long(v) => v,
            Self::Short(v) => i64::from(v),
            Self::Byte(v) => i64::from(v),
            Self::Float(v) => v as i64,
            Self::Double(v) => v as i64,
        }
    }
}

impl Reflect for Number {
    fn raw_type() -> RawType {
        RawType::named(builtin::NUMBER)
    }
}

impl Reflect for String {
    fn raw_type() -> RawType {
        RawType::named(builtin::STRING)
    }

    fn upcast(&self, target: TypeId) -> Option<AnyValue> {
        upcast_as(target, || CharSequence(self.clone()))
    }
}

macro_rules! reflect_number {
    ($($rust:ty => $name:ident, $variant:ident;)+) => {
        $(
            impl Reflect for $rust {
                fn raw_type() -> RawType {
                    RawType::named(builtin::$name)
                }

                fn upcast(&self, target: TypeId) -> Option<AnyValue> {
                    upcast_as(target, || Number::$variant(*self))
                }
            }
        )+
    };
}

reflect_number! {
    i32 => INT, Int;
    i64 => LONG, Long;
    i16 => SHORT, Short;
    i8 => BYTE, Byte;
    f32 => FLOAT, Float;
    f64 => DOUBLE, Double;
}

impl Reflect for bool {
    fn raw_type() -> RawType {
        RawType::named(builtin::BOOLEAN)
    }
}

impl Reflect for char {
    fn raw_type() -> RawType {
        RawType::named(builtin::CHAR)
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn raw_type() -> RawType {
        RawType::generic_array_of(T::raw_type())
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn raw_type() -> RawType {
        RawType::array_of(T::raw_type())
    }
}

// ============================================================================
// Descriptor Cache
// ============================================================================

/// Canonical descriptors of Rust types, computed once per [`TypeId`].
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, TypeDescriptor>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical descriptor of `T`.
    pub fn descriptor_of<T: Reflect>(&self) -> TypeResult<TypeDescriptor> {
        let id = TypeId::of::<T>();
        if let Some(descriptor) = self.entries.read().get(&id) {
            return Ok(descriptor.clone());
        }

        let descriptor = T::raw_type().canonicalize()?;
        Ok(self
            .entries
            .write()
            .entry(id)
            .or_insert(descriptor)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Shape {
        Circle(f64),
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Circle(f64);

    reflect_type!(Shape, "Shape");
    reflect_type!(Circle, "Circle" => Shape: |c| Shape::Circle(c.0));

    #[test]
    fn test_builtin_shapes() {
        assert_eq!(i32::raw_type(), RawType::named("Int"));
        assert_eq!(f64::raw_type(), RawType::named("Double"));
        assert_eq!(
            Vec::<String>::raw_type().canonicalize().unwrap(),
            <[String; 3]>::raw_type().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_number_upcast() {
        let view = 7i64.upcast(TypeId::of::<Number>()).unwrap();
        assert_eq!(view.downcast_ref::<Number>(), Some(&Number::Long(7)));
        assert!(7i64.upcast(TypeId::of::<String>()).is_none());
        assert_eq!(Number::Float(1.5).as_f64(), 1.5);
        assert_eq!(Number::Double(2.9).as_i64(), 2);
    }

    #[test]
    fn test_macro_upcast() {
        let circle = Circle(2.0);
        let view = circle.upcast(TypeId::of::<Shape>()).unwrap();
        assert_eq!(view.downcast_ref::<Shape>(), Some(&Shape::Circle(2.0)));
        assert!(circle.upcast(TypeId::of::<Circle>()).is_none());
        assert_eq!(Circle::raw_type(), RawType::named("Circle"));
    }

    #[test]
    fn test_dyn_reflect_downcast() {
        let value: Box<dyn Reflect> = Box::new(String::from("x"));
        assert_eq!(value.as_ref().as_any().downcast_ref::<String>().map(String::as_str), Some("x"));
        assert!(value.type_name().contains("String"));
    }

    #[test]
    fn test_descriptor_cache() {
        let cache = DescriptorCache::new();
        let first = cache.descriptor_of::<Vec<i32>>().unwrap();
        let second = cache.descriptor_of::<Vec<i32>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, TypeDescriptor::array_of(TypeDescriptor::plain("Int")));
        assert_eq!(cache.len(), 1);
    }
}
