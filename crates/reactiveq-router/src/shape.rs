//! Declared reactor types for the erased registration API.

use reactiveq_core::{RawType, Reflect, TypeDescriptor};

/// A declared type plus the context its variables are resolved against.
///
/// A shape like `List<E>` declared inside `Inbox<E>` is registered with the
/// context `Inbox<String>` and resolves to `List<String>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    raw: RawType,
    context: Option<TypeDescriptor>,
}

impl Shape {
    pub fn new(raw: impl Into<RawType>) -> Self {
        Self {
            raw: raw.into(),
            context: None,
        }
    }

    /// The shape of a Rust type.
    pub fn of<T: Reflect>() -> Self {
        Self::new(T::raw_type())
    }

    /// Resolves variables against `context`.
    pub fn in_context(mut self, context: TypeDescriptor) -> Self {
        self.context = Some(context);
        self
    }

    pub fn raw(&self) -> &RawType {
        &self.raw
    }

    pub fn context(&self) -> Option<&TypeDescriptor> {
        self.context.as_ref()
    }
}

impl From<RawType> for Shape {
    fn from(raw: RawType) -> Self {
        Self::new(raw)
    }
}

impl From<TypeDescriptor> for Shape {
    fn from(descriptor: TypeDescriptor) -> Self {
        Self::new(descriptor)
    }
}
