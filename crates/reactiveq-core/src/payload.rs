//! Type-erased values travelling through the router.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::reflect::Reflect;
use crate::types::TypeDescriptor;

/// A shared, type-erased value together with its canonical descriptor.
///
/// Payloads are cheap to clone; every reactor reached by one dispatch sees the
/// same underlying value.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Reflect>,
    descriptor: TypeDescriptor,
}

impl Payload {
    /// Wraps `value` under an explicitly supplied descriptor.
    pub fn new<T: Reflect>(value: T, descriptor: TypeDescriptor) -> Self {
        Self {
            value: Arc::new(value),
            descriptor,
        }
    }

    /// Wraps an already shared value.
    pub fn from_arc(value: Arc<dyn Reflect>, descriptor: TypeDescriptor) -> Self {
        Self { value, descriptor }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The erased value.
    pub fn value(&self) -> &dyn Reflect {
        &*self.value
    }

    /// Rust type name of the carried value.
    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    /// Returns `true` if the carried value is exactly a `T`.
    pub fn is<T: Any>(&self) -> bool {
        (*self.value).as_any().is::<T>()
    }

    /// Borrows the carried value if it is exactly a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).as_any().downcast_ref()
    }

    /// Runs `f` against the value viewed as `T`.
    ///
    /// Uses the value itself when it is a `T`, otherwise an upcast view. Returns
    /// `None` if neither exists.
    pub fn with_view<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        if let Some(value) = self.downcast_ref::<T>() {
            return Some(f(value));
        }
        let view = self.value.upcast(TypeId::of::<T>())?;
        view.downcast_ref::<T>().map(f)
    }

    /// An owned copy of the value viewed as `T`.
    pub fn view<T: Any + Clone>(&self) -> Option<T> {
        if let Some(value) = self.downcast_ref::<T>() {
            return Some(value.clone());
        }
        let view = self.value.upcast(TypeId::of::<T>())?;
        view.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Consumes the payload, yielding the value viewed as `T`.
    ///
    /// The value is moved out when this is its last reference and cloned
    /// otherwise.
    pub fn into_view<T: Any + Clone + Send + Sync>(self) -> Option<T> {
        if self.is::<T>() {
            let shared = self.value.into_any_arc().downcast::<T>().ok()?;
            return Some(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()));
        }
        let view = self.value.upcast(TypeId::of::<T>())?;
        view.downcast::<T>().ok().map(|boxed| *boxed)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("descriptor", &format_args!("{}", self.descriptor))
            .field("type_name", &self.type_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{CharSequence, Number};

    fn string_payload(text: &str) -> Payload {
        Payload::new(text.to_string(), TypeDescriptor::plain("String"))
    }

    #[test]
    fn test_exact_view() {
        let payload = string_payload("hello");
        assert!(payload.is::<String>());
        assert_eq!(payload.with_view(|s: &String| s.len()), Some(5));
        assert_eq!(payload.view::<String>().as_deref(), Some("hello"));
    }

    #[test]
    fn test_upcast_view() {
        let payload = string_payload("hello");
        assert!(!payload.is::<CharSequence>());
        assert_eq!(payload.with_view(|s: &CharSequence| s.len()), Some(5));
        assert_eq!(payload.view::<CharSequence>(), Some(CharSequence::new("hello")));
    }

    #[test]
    fn test_missing_view() {
        let payload = string_payload("hello");
        assert!(payload.with_view(|_: &Number| ()).is_none());
        assert!(payload.view::<i32>().is_none());
    }

    #[test]
    fn test_into_view_moves_or_clones() {
        let payload = string_payload("owned");
        assert_eq!(payload.into_view::<String>().as_deref(), Some("owned"));

        let payload = string_payload("shared");
        let _other = payload.clone();
        assert_eq!(payload.into_view::<String>().as_deref(), Some("shared"));

        let payload = Payload::new(9i64, TypeDescriptor::plain("Long"));
        assert_eq!(payload.into_view::<Number>(), Some(Number::Long(9)));
    }

    #[test]
    fn test_clones_share_value() {
        let payload = Payload::new(3i32, TypeDescriptor::plain("Int"));
        let other = payload.clone();
        assert!(Arc::ptr_eq(&payload.value, &other.value));
        assert_eq!(other.view::<Number>(), Some(Number::Int(3)));
    }
}
