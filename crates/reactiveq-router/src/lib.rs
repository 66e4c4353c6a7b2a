//! # reactiveq Router
//!
//! In-process routing of values to reactors by runtime type.
//!
//! ## Protocols
//!
//! - **Push**: fire-and-forget delivery to every accepting reactor ([`ReactorRouter::push`])
//! - **Pull**: collect values from every compatible producer ([`ReactorRouter::pull`])
//! - **Query**: ask every compatible responder with an input value ([`PullRequest::with_query`])
//!
//! ## Registration
//!
//! Every registration returns a [`Subscription`]. Reactors stay registered until
//! it is detached. Attaching and detaching publish a [`ReactorCount`] through
//! the router itself.
//!
//! ```text
//! ┌────────┐  push   ┌──────────────┐   assignable   ┌─────────┐
//! │ caller │───────▶│ ReactorRouter │──────────────▶│ reactor │
//! │        │◀───────│   (buckets)   │◀──────────────│ reactor │
//! └────────┘ results └──────────────┘   pull/query   └─────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use reactiveq_router::ReactorRouter;
//!
//! let router = ReactorRouter::new();
//! let _double = router.on_query(|n: &i32| n * 2).unwrap();
//!
//! let answers = router.query::<i32, i32>(21).unwrap();
//! assert_eq!(answers[0].as_ref().ok(), Some(&42));
//! ```

mod counter;
mod error;
mod options;
mod outcome;
mod reactor;
mod request;
mod router;
mod shape;
mod subscription;

pub use counter::{REACTOR_COUNT, ReactorCount};
pub use error::{BoxError, ReactorError, ReactorResult, RouterError, RouterResult};
pub use options::RouterOptions;
pub use outcome::OutcomeExt;
pub use reactor::{Protocol, PullHandler, PushHandler, QueryHandler, Reactor};
pub use request::PullRequest;
pub use router::{ReactorRouter, RouterStats};
pub use shape::Shape;
pub use subscription::Subscription;
