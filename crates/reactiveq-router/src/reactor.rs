//! Registered reactors.
//!
//! A reactor is an immutable record of what it accepts, what it produces and
//! the erased callback to run. Typed registration on
//! [`ReactorRouter`](crate::ReactorRouter) builds these from closures.

use std::fmt;
use std::sync::Arc;

use reactiveq_core::{Payload, TypeDescriptor};

use crate::error::ReactorResult;

/// The three ways a reactor can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Fire-and-forget delivery of a value.
    Push,
    /// Request for values of a type, without input.
    Pull,
    /// Request for values of a type, given a query value.
    Query,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Push, Protocol::Pull, Protocol::Query];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Push => 0,
            Self::Pull => 1,
            Self::Query => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Erased push callback; returns `false` if it could not take the value.
pub type PushHandler = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;
/// Erased pull callback.
pub type PullHandler = Arc<dyn Fn() -> ReactorResult<Payload> + Send + Sync>;
/// Erased query callback.
pub type QueryHandler = Arc<dyn Fn(&Payload) -> ReactorResult<Payload> + Send + Sync>;

/// A registered callback and the descriptors it was registered under.
#[derive(Clone)]
pub enum Reactor {
    Push {
        accepts: TypeDescriptor,
        handler: PushHandler,
    },
    Pull {
        produces: TypeDescriptor,
        handler: PullHandler,
    },
    Query {
        accepts: TypeDescriptor,
        produces: TypeDescriptor,
        handler: QueryHandler,
    },
}

impl Reactor {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Push { .. } => Protocol::Push,
            Self::Pull { .. } => Protocol::Pull,
            Self::Query { .. } => Protocol::Query,
        }
    }

    /// The descriptor of the bucket this reactor lives in: the accepted type
    /// for push and query reactors, the produced type for pull reactors.
    pub fn key(&self) -> &TypeDescriptor {
        match self {
            Self::Push { accepts, .. } | Self::Query { accepts, .. } => accepts,
            Self::Pull { produces, .. } => produces,
        }
    }

    /// The produced type, for pull and query reactors.
    pub fn produces(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Push { .. } => None,
            Self::Pull { produces, .. } | Self::Query { produces, .. } => Some(produces),
        }
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Reactor");
        debug.field("protocol", &self.protocol());
        match self {
            Self::Push { accepts, .. } => debug.field("accepts", &format_args!("{accepts}")),
            Self::Pull { produces, .. } => debug.field("produces", &format_args!("{produces}")),
            Self::Query {
                accepts, produces, ..
            } => debug
                .field("accepts", &format_args!("{accepts}"))
                .field("produces", &format_args!("{produces}")),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_keys() {
        let push = Reactor::Push {
            accepts: TypeDescriptor::plain("String"),
            handler: Arc::new(|_: &Payload| true),
        };
        let one = || -> ReactorResult<Payload> { Ok(Payload::new(1i32, TypeDescriptor::plain("Int"))) };
        let pull = Reactor::Pull {
            produces: TypeDescriptor::plain("Int"),
            handler: Arc::new(one),
        };
        let query = Reactor::Query {
            accepts: TypeDescriptor::plain("String"),
            produces: TypeDescriptor::plain("Int"),
            handler: Arc::new(move |_: &Payload| one()),
        };

        assert_eq!(push.key(), &TypeDescriptor::plain("String"));
        assert_eq!(pull.key(), &TypeDescriptor::plain("Int"));
        assert_eq!(query.key(), &TypeDescriptor::plain("String"));
        assert_eq!(query.produces(), Some(&TypeDescriptor::plain("Int")));
        assert!(push.produces().is_none());
        assert_eq!(
            format!("{query:?}"),
            "Reactor { protocol: Query, accepts: String, produces: Int }"
        );
    }

    #[test]
    fn test_protocol_indices_are_distinct() {
        let indices: Vec<_> = Protocol::ALL.iter().map(|p| p.index()).collect();
        assert_eq!(indices, [0, 1, 2]);
    }
}
