//! Pull request builder.

use std::marker::PhantomData;

use reactiveq_core::Reflect;

use crate::error::{ReactorResult, RouterResult};
use crate::router::ReactorRouter;

/// A pending request for values of type `T`, returned by
/// [`ReactorRouter::pull`].
///
/// ```rust
/// use reactiveq_router::ReactorRouter;
///
/// let router = ReactorRouter::new();
/// let _greeting = router.on_pull(|| "hello".to_string()).unwrap();
/// let _echo = router.on_query(|name: &String| format!("some {name}")).unwrap();
///
/// let plain = router.pull::<String>().fetch().unwrap();
/// assert_eq!(plain[0].as_deref().ok(), Some("hello"));
///
/// let queried = router.pull::<String>().with_query("value".to_string()).unwrap();
/// assert_eq!(queried[0].as_deref().ok(), Some("some value"));
/// ```
#[must_use = "a pull request does nothing until fetched"]
pub struct PullRequest<'r, T> {
    router: &'r ReactorRouter,
    _result: PhantomData<fn() -> T>,
}

impl<'r, T: Reflect + Clone> PullRequest<'r, T> {
    pub(crate) fn new(router: &'r ReactorRouter) -> Self {
        Self {
            router,
            _result: PhantomData,
        }
    }

    /// Runs every pull reactor producing a compatible `T`.
    pub fn fetch(self) -> RouterResult<Vec<ReactorResult<T>>> {
        self.router.fetch::<T>()
    }

    /// Runs every query reactor accepting `query` and producing a compatible
    /// `T`.
    pub fn with_query<Q: Reflect>(self, query: Q) -> RouterResult<Vec<ReactorResult<T>>> {
        self.router.query::<Q, T>(query)
    }
}
