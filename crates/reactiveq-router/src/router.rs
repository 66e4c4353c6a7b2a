//! The type-directed reactor router.
//!
//! The router keeps one [`Bucket`] per canonical descriptor. Every bucket holds
//! three [`DetachableRegistry`] lists, one per [`Protocol`]. Dispatch never
//! looks a bucket up by equality; it scans the bucket keys for assignability
//! matches:
//!
//! | protocol | bucket key          | matches when                                    |
//! |----------|---------------------|-------------------------------------------------|
//! | push     | accepted type       | key is assignable from the pushed type          |
//! | pull     | produced type       | requested type is assignable from the key       |
//! | query    | accepted query type | key is assignable from the query type, and the requested type is assignable from the reactor's produced type |
//!
//! Reactors run on the caller's thread with no router lock held, so reactors
//! may register, detach and dispatch re-entrantly.
//!
//! # Example
//!
//! ```rust
//! use reactiveq_core::CharSequence;
//! use reactiveq_router::ReactorRouter;
//! use std::sync::{Arc, Mutex};
//!
//! let router = ReactorRouter::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = router
//!     .on_push(move |text: &CharSequence| sink.lock().unwrap().push(text.to_string()))
//!     .unwrap();
//!
//! assert_eq!(router.push("some value".to_string()).unwrap(), 1);
//! subscription.detach();
//! assert!(router.push("other value".to_string()).is_err());
//!
//! assert_eq!(*seen.lock().unwrap(), ["some value"]);
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use reactiveq_core::{
    AssignabilityChecker, DescriptorCache, DetachableRegistry, Payload, Reflect, TypeDecl,
    TypeDescriptor, TypeError, TypeHierarchy, TypeResolver, TypeResult,
};
use tracing::{debug, trace, trace_span, warn};

use crate::counter::{ReactorCount, declare_reactor_count, is_reported};
use crate::error::{BoxError, ReactorError, ReactorResult, RouterError, RouterResult};
use crate::options::RouterOptions;
use crate::reactor::{Protocol, PullHandler, PushHandler, QueryHandler, Reactor};
use crate::request::PullRequest;
use crate::shape::Shape;
use crate::subscription::Subscription;

// ============================================================================
// Buckets
// ============================================================================

/// All reactors registered under one canonical descriptor.
///
/// Buckets are created on first registration and never removed.
pub(crate) struct Bucket {
    key: TypeDescriptor,
    order: u64,
    registries: [DetachableRegistry<Arc<Reactor>>; 3],
}

impl Bucket {
    fn new(key: TypeDescriptor, order: u64) -> Self {
        Self {
            key,
            order,
            registries: Default::default(),
        }
    }

    pub(crate) fn key(&self) -> &TypeDescriptor {
        &self.key
    }

    fn registry(&self, protocol: Protocol) -> &DetachableRegistry<Arc<Reactor>> {
        &self.registries[protocol.index()]
    }

    fn count(&self) -> ReactorCount {
        ReactorCount::new(
            self.key.clone(),
            self.registry(Protocol::Push).len(),
            self.registry(Protocol::Pull).len(),
            self.registry(Protocol::Query).len(),
        )
    }
}

type Matches = Arc<[Arc<Bucket>]>;

/// Cached dispatch matches, valid for one (bucket count, hierarchy revision)
/// generation.
#[derive(Default)]
struct MatchCache {
    generation: (u64, u64),
    entries: HashMap<(Protocol, TypeDescriptor), Matches>,
}

// ============================================================================
// Router
// ============================================================================

pub(crate) struct RouterShared {
    hierarchy: TypeHierarchy,
    table: RwLock<HashMap<TypeDescriptor, Arc<Bucket>>>,
    buckets_created: AtomicU64,
    cache: Mutex<MatchCache>,
    descriptors: DescriptorCache,
    options: RouterOptions,
}

impl RouterShared {
    fn generation(&self) -> (u64, u64) {
        (
            self.buckets_created.load(Ordering::Acquire),
            self.hierarchy.revision(),
        )
    }

    fn bucket(&self, key: &TypeDescriptor) -> Arc<Bucket> {
        if let Some(bucket) = self.table.read().get(key) {
            return Arc::clone(bucket);
        }

        let mut table = self.table.write();
        let bucket = table.entry(key.clone()).or_insert_with(|| {
            let order = self.buckets_created.fetch_add(1, Ordering::AcqRel);
            debug!(descriptor = %key, "Created reactor bucket");
            Arc::new(Bucket::new(key.clone(), order))
        });
        Arc::clone(bucket)
    }

    fn matching(&self, protocol: Protocol, descriptor: &TypeDescriptor) -> Matches {
        let cache_key = (protocol, descriptor.clone());
        if self.options.cache_matches {
            let mut cache = self.cache.lock();
            let current = self.generation();
            if cache.generation != current {
                cache.entries.clear();
                cache.generation = current;
            }
            if let Some(hit) = cache.entries.get(&cache_key) {
                return Arc::clone(hit);
            }
        }

        let checker = AssignabilityChecker::new(&self.hierarchy);
        let (generation, matches) = {
            let table = self.table.read();
            let generation = self.generation();
            let mut matches: Vec<Arc<Bucket>> = table
                .values()
                .filter(|bucket| match protocol {
                    Protocol::Push | Protocol::Query => {
                        checker.is_assignable(&bucket.key, descriptor)
                    }
                    Protocol::Pull => checker.is_assignable(descriptor, &bucket.key),
                })
                .cloned()
                .collect();
            matches.sort_by_key(|bucket| bucket.order);
            (generation, Matches::from(matches))
        };
        trace!(
            %protocol,
            descriptor = %descriptor,
            buckets = matches.len(),
            "Computed matching buckets"
        );

        if self.options.cache_matches {
            let mut cache = self.cache.lock();
            if self.generation() == generation {
                if cache.generation != generation {
                    cache.entries.clear();
                    cache.generation = generation;
                }
                cache.entries.insert(cache_key, Arc::clone(&matches));
            }
        }
        matches
    }

    fn check(&self, descriptor: TypeDescriptor) -> TypeResult<TypeDescriptor> {
        if let Some(variable) = descriptor.first_variable() {
            return Err(TypeError::UnresolvedVariable {
                variable: variable.clone(),
                descriptor: descriptor.clone(),
            });
        }
        self.hierarchy.validate(&descriptor)?;
        Ok(descriptor)
    }
}

/// Snapshot of how many buckets and reactors a router holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub buckets: usize,
    pub push: usize,
    pub pull: usize,
    pub query: usize,
}

/// In-process router delivering values to reactors by runtime type.
///
/// Cloning is cheap; clones share the same reactors.
#[derive(Clone)]
pub struct ReactorRouter {
    shared: Arc<RouterShared>,
}

impl Default for ReactorRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorRouter {
    /// Creates a router over the built-in type hierarchy with default options.
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        Self::with_hierarchy(TypeHierarchy::with_builtins(), options)
    }

    /// Creates a router over an existing hierarchy.
    ///
    /// `ReactorCount` is declared in it so count notifications stay out of
    /// their own accounting.
    pub fn with_hierarchy(hierarchy: TypeHierarchy, options: RouterOptions) -> Self {
        declare_reactor_count(&hierarchy);
        debug!(?options, types = hierarchy.len(), "Created reactor router");
        Self {
            shared: Arc::new(RouterShared {
                hierarchy,
                table: RwLock::new(HashMap::new()),
                buckets_created: AtomicU64::new(0),
                cache: Mutex::new(MatchCache::default()),
                descriptors: DescriptorCache::new(),
                options,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<RouterShared>) -> Self {
        Self { shared }
    }

    pub fn options(&self) -> &RouterOptions {
        &self.shared.options
    }

    /// The type hierarchy used for assignability.
    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.shared.hierarchy
    }

    /// Declares a type in the router's hierarchy.
    pub fn declare(&self, decl: TypeDecl) {
        self.shared.hierarchy.declare(decl);
    }

    // ------------------------------------------------------------------------
    // Descriptors
    // ------------------------------------------------------------------------

    /// The routable descriptor of a Rust type.
    pub fn descriptor_of<T: Reflect>(&self) -> RouterResult<TypeDescriptor> {
        let descriptor = self.shared.descriptors.descriptor_of::<T>()?;
        Ok(self.shared.check(descriptor)?)
    }

    /// Canonicalizes a declared shape and resolves it against its context.
    ///
    /// Fails if a wildcard is malformed, a variable survives resolution, or a
    /// declared generic type gets the wrong number of arguments.
    pub fn resolve(&self, shape: &Shape) -> RouterResult<TypeDescriptor> {
        let canonical = shape.raw().canonicalize()?;
        let resolved = match shape.context() {
            Some(context) => TypeResolver::new(&self.shared.hierarchy).resolve_in(context, &canonical),
            None => canonical,
        };
        Ok(self.shared.check(resolved)?)
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers an erased reactor.
    pub fn attach(&self, reactor: Reactor) -> RouterResult<Subscription> {
        self.shared.check(reactor.key().clone())?;
        if let Some(produces) = reactor.produces() {
            self.shared.check(produces.clone())?;
        }

        let protocol = reactor.protocol();
        let bucket = self.shared.bucket(reactor.key());
        let (handle, position) = bucket.registry(protocol).push(Arc::new(reactor));
        debug!(%protocol, descriptor = %bucket.key(), position, "Attached reactor");

        self.report(&bucket);
        Ok(Subscription::new(
            handle,
            Arc::downgrade(&self.shared),
            bucket,
            protocol,
        ))
    }

    pub fn attach_push(
        &self,
        accepts: &Shape,
        handler: impl Fn(&Payload) + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        self.attach(Reactor::Push {
            accepts: self.resolve(accepts)?,
            handler: Arc::new(move |payload: &Payload| {
                handler(payload);
                true
            }),
        })
    }

    pub fn attach_pull(
        &self,
        produces: &Shape,
        handler: impl Fn() -> ReactorResult<Payload> + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        self.attach(Reactor::Pull {
            produces: self.resolve(produces)?,
            handler: Arc::new(handler),
        })
    }

    pub fn attach_query(
        &self,
        accepts: &Shape,
        produces: &Shape,
        handler: impl Fn(&Payload) -> ReactorResult<Payload> + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        self.attach(Reactor::Query {
            accepts: self.resolve(accepts)?,
            produces: self.resolve(produces)?,
            handler: Arc::new(handler),
        })
    }

    /// Registers a reactor for every pushed value assignable to `T`.
    ///
    /// Values of a subtype reach the reactor through their
    /// [`Reflect::upcast`] view. A value with no `T` view is skipped with a
    /// warning and does not count as delivered.
    pub fn on_push<T: Reflect>(
        &self,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        let accepts = self.descriptor_of::<T>()?;
        let expected = std::any::type_name::<T>();
        let handler: PushHandler = Arc::new(move |payload: &Payload| {
            let delivered = payload.with_view(|value: &T| handler(value)).is_some();
            if !delivered {
                warn!(
                    descriptor = %payload.descriptor(),
                    actual = payload.type_name(),
                    expected,
                    "Pushed value has no view for reactor, skipped"
                );
            }
            delivered
        });
        self.attach(Reactor::Push { accepts, handler })
    }

    /// Registers a reactor producing `T` on demand.
    pub fn on_pull<T: Reflect>(
        &self,
        handler: impl Fn() -> T + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        let produces = self.descriptor_of::<T>()?;
        let descriptor = produces.clone();
        let handler: PullHandler =
            Arc::new(move || -> ReactorResult<Payload> { Ok(Payload::new(handler(), descriptor.clone())) });
        self.attach(Reactor::Pull { produces, handler })
    }

    /// Like [`on_pull`](Self::on_pull) for reactors that can fail.
    pub fn on_try_pull<T: Reflect, E: Into<BoxError>>(
        &self,
        handler: impl Fn() -> Result<T, E> + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        let produces = self.descriptor_of::<T>()?;
        let descriptor = produces.clone();
        let handler: PullHandler = Arc::new(move || -> ReactorResult<Payload> {
            handler()
                .map(|value| Payload::new(value, descriptor.clone()))
                .map_err(ReactorError::failed)
        });
        self.attach(Reactor::Pull { produces, handler })
    }

    /// Registers a reactor answering queries of type `Q` with an `R`.
    pub fn on_query<Q: Reflect, R: Reflect>(
        &self,
        handler: impl Fn(&Q) -> R + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        self.on_try_query(move |query: &Q| Ok::<R, Infallible>(handler(query)))
    }

    /// Alias of [`on_query`](Self::on_query).
    pub fn on_respond<Q: Reflect, R: Reflect>(
        &self,
        handler: impl Fn(&Q) -> R + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        self.on_query(handler)
    }

    /// Like [`on_query`](Self::on_query) for reactors that can fail.
    pub fn on_try_query<Q: Reflect, R: Reflect, E: Into<BoxError>>(
        &self,
        handler: impl Fn(&Q) -> Result<R, E> + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        let accepts = self.descriptor_of::<Q>()?;
        let produces = self.descriptor_of::<R>()?;
        let descriptor = produces.clone();
        let handler: QueryHandler = Arc::new(move |query: &Payload| -> ReactorResult<Payload> {
            let answer = query
                .with_view(|value: &Q| handler(value))
                .ok_or_else(|| view_unavailable::<Q>(query))?;
            answer
                .map(|value| Payload::new(value, descriptor.clone()))
                .map_err(ReactorError::failed)
        });
        self.attach(Reactor::Query {
            accepts,
            produces,
            handler,
        })
    }

    /// Observes reactor-count changes of every reported bucket.
    pub fn on_reactor_count(
        &self,
        handler: impl Fn(&ReactorCount) + Send + Sync + 'static,
    ) -> RouterResult<Subscription> {
        self.on_push(handler)
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Delivers `value` to every push reactor accepting its type and returns
    /// how many received it.
    ///
    /// Fails with [`RouterError::Undelivered`] when reactors matched but none
    /// had a view of the value.
    pub fn push<T: Reflect>(&self, value: T) -> RouterResult<usize> {
        let descriptor = self.descriptor_of::<T>()?;
        self.push_payload(Payload::new(value, descriptor))
    }

    pub fn push_payload(&self, payload: Payload) -> RouterResult<usize> {
        let span = trace_span!("push", descriptor = %payload.descriptor());
        let _enter = span.enter();

        let (mut reached, mut skipped) = (0, 0);
        for bucket in self.shared.matching(Protocol::Push, payload.descriptor()).iter() {
            for reactor in bucket.registry(Protocol::Push) {
                if let Reactor::Push { handler, .. } = &*reactor {
                    if handler(&payload) {
                        reached += 1;
                    } else {
                        skipped += 1;
                    }
                }
            }
        }

        match (reached, skipped) {
            (0, 0) => Err(RouterError::NoReactors {
                protocol: Protocol::Push,
                descriptor: payload.descriptor().clone(),
            }),
            (0, skipped) => Err(RouterError::Undelivered {
                descriptor: payload.descriptor().clone(),
                skipped,
            }),
            (reached, skipped) => {
                trace!(reached, skipped, "Delivered pushed value");
                Ok(reached)
            }
        }
    }

    /// Starts a request for values of type `T`.
    ///
    /// Pull reactors match when `T` is assignable from the type they
    /// produce: a `CharSequence` request collects `String` producers, never
    /// the reverse, so every fetched value is a valid `T`.
    pub fn pull<T: Reflect + Clone>(&self) -> PullRequest<'_, T> {
        PullRequest::new(self)
    }

    pub(crate) fn fetch<T: Reflect + Clone>(&self) -> RouterResult<Vec<ReactorResult<T>>> {
        let descriptor = self.descriptor_of::<T>()?;
        let results = self.pull_payloads(&descriptor)?;
        Ok(results.into_iter().map(|result| result.and_then(view_as::<T>)).collect())
    }

    /// Runs every pull reactor whose produced type is assignable to `produces`.
    pub fn pull_payloads(
        &self,
        produces: &TypeDescriptor,
    ) -> RouterResult<Vec<ReactorResult<Payload>>> {
        let span = trace_span!("pull", descriptor = %produces);
        let _enter = span.enter();

        let mut results = Vec::new();
        for bucket in self.shared.matching(Protocol::Pull, produces).iter() {
            for reactor in bucket.registry(Protocol::Pull) {
                if let Reactor::Pull { handler, .. } = &*reactor {
                    results.push(self.invoke(|| handler()));
                }
            }
        }

        if results.is_empty() {
            return Err(RouterError::NoReactors {
                protocol: Protocol::Pull,
                descriptor: produces.clone(),
            });
        }
        trace!(reached = results.len(), "Collected pulled values");
        Ok(results)
    }

    /// Runs every query reactor accepting `query` whose answers are of type `R`.
    pub fn query<Q: Reflect, R: Reflect + Clone>(
        &self,
        query: Q,
    ) -> RouterResult<Vec<ReactorResult<R>>> {
        let accepts = self.descriptor_of::<Q>()?;
        let produces = self.descriptor_of::<R>()?;
        let results = self.query_payloads(&Payload::new(query, accepts), &produces)?;
        Ok(results.into_iter().map(|result| result.and_then(view_as::<R>)).collect())
    }

    pub fn query_payloads(
        &self,
        query: &Payload,
        produces: &TypeDescriptor,
    ) -> RouterResult<Vec<ReactorResult<Payload>>> {
        let span = trace_span!("query", descriptor = %query.descriptor(), produces = %produces);
        let _enter = span.enter();

        let checker = AssignabilityChecker::new(&self.shared.hierarchy);
        let mut results = Vec::new();
        for bucket in self.shared.matching(Protocol::Query, query.descriptor()).iter() {
            for reactor in bucket.registry(Protocol::Query) {
                if let Reactor::Query {
                    produces: answer,
                    handler,
                    ..
                } = &*reactor
                {
                    if checker.is_assignable(produces, answer) {
                        results.push(self.invoke(|| handler(query)));
                    }
                }
            }
        }

        if results.is_empty() {
            return Err(RouterError::NoReactors {
                protocol: Protocol::Query,
                descriptor: query.descriptor().clone(),
            });
        }
        trace!(reached = results.len(), "Collected query answers");
        Ok(results)
    }

    fn invoke(&self, reactor: impl FnOnce() -> ReactorResult<Payload>) -> ReactorResult<Payload> {
        if !self.shared.options.catch_panics {
            return reactor();
        }
        catch_unwind(AssertUnwindSafe(reactor)).unwrap_or_else(|panic| {
            let error = ReactorError::from_panic(panic);
            warn!(%error, "Reactor panicked");
            Err(error)
        })
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Current reactor count of the bucket keyed exactly by `descriptor`.
    pub fn reactor_count(&self, descriptor: &TypeDescriptor) -> Option<ReactorCount> {
        self.shared.table.read().get(descriptor).map(|bucket| bucket.count())
    }

    pub fn stats(&self) -> RouterStats {
        let table = self.shared.table.read();
        table.values().fold(
            RouterStats {
                buckets: table.len(),
                ..RouterStats::default()
            },
            |mut stats, bucket| {
                stats.push += bucket.registry(Protocol::Push).len();
                stats.pull += bucket.registry(Protocol::Pull).len();
                stats.query += bucket.registry(Protocol::Query).len();
                stats
            },
        )
    }

    /// Publishes the current count of `bucket`, unless its key is unreported.
    pub(crate) fn report(&self, bucket: &Bucket) {
        if !self.shared.options.report_counts || !is_reported(&self.shared.hierarchy, &bucket.key) {
            return;
        }

        let count = bucket.count();
        trace!(
            descriptor = %count.descriptor,
            push = count.push,
            pull = count.pull,
            query = count.query,
            "Reactor count changed"
        );
        match self.push(count) {
            Ok(_) | Err(RouterError::NoReactors { .. }) => {}
            Err(error) => warn!(%error, "Failed to publish reactor count"),
        }
    }
}

impl fmt::Debug for ReactorRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorRouter")
            .field("options", &self.shared.options)
            .field("stats", &self.stats())
            .finish()
    }
}

fn view_as<T: Reflect + Clone>(payload: Payload) -> ReactorResult<T> {
    let descriptor = payload.descriptor().clone();
    let actual = payload.type_name();
    payload
        .into_view::<T>()
        .ok_or_else(|| ReactorError::ViewUnavailable {
            descriptor,
            actual,
            expected: std::any::type_name::<T>(),
        })
}

fn view_unavailable<T>(payload: &Payload) -> ReactorError {
    ReactorError::ViewUnavailable {
        descriptor: payload.descriptor().clone(),
        actual: payload.type_name(),
        expected: std::any::type_name::<T>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeExt;
    use reactiveq_core::{CharSequence, Detach, Number, RawType};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct A<T>(T);

    impl<T: Reflect> Reflect for A<T> {
        fn raw_type() -> RawType {
            RawType::parameterized("A", [T::raw_type()])
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Animal(&'static str);

    #[derive(Debug, Clone, PartialEq)]
    struct Dog(&'static str);

    reactiveq_core::reflect_type!(Animal, "Animal");
    reactiveq_core::reflect_type!(Dog, "Dog" => Animal: |dog| Animal(dog.0));

    /// Declared under `Animal` below, but with no Rust view of it.
    #[derive(Debug, Clone)]
    struct Stray;

    reactiveq_core::reflect_type!(Stray, "Stray");

    #[derive(Debug, Clone)]
    struct Names;

    reactiveq_core::reflect_type!(Names, "Names");

    #[derive(Debug, Clone, PartialEq)]
    struct IntList(Vec<i32>);

    impl Reflect for IntList {
        fn raw_type() -> RawType {
            RawType::parameterized("List", [RawType::named("Int")])
        }
    }

    #[derive(Debug, Clone)]
    struct Heartbeat;

    reactiveq_core::reflect_type!(Heartbeat, "Heartbeat");

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static)
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().push(value.clone()))
    }

    fn silent() -> ReactorRouter {
        ReactorRouter::with_options(RouterOptions {
            report_counts: false,
            ..RouterOptions::default()
        })
    }

    #[test]
    fn test_push_reaches_reactor() {
        let router = ReactorRouter::new();
        let (seen, sink) = recorder::<String>();
        let _subscription = router.on_push(sink).unwrap();

        assert_eq!(router.push("some value".to_string()).unwrap(), 1);
        assert_eq!(*seen.lock(), ["some value"]);
    }

    #[test]
    fn test_detached_reactor_is_not_reached() {
        let router = ReactorRouter::new();
        let (seen, sink) = recorder::<String>();
        let subscription = router.on_push(sink).unwrap();

        assert!(subscription.detach());
        assert!(!subscription.detach());
        assert!(subscription.is_detached());

        let result = router.push("some value".to_string());
        assert!(matches!(result, Err(RouterError::NoReactors { protocol: Protocol::Push, .. })));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_push_two_types() {
        let router = ReactorRouter::new();
        let (texts, text_sink) = recorder::<String>();
        let (numbers, number_sink) = recorder::<i32>();
        let _a = router.on_push(text_sink).unwrap();
        let _b = router.on_push(number_sink).unwrap();

        router.push("some value".to_string()).unwrap();
        router.push(123i32).unwrap();

        assert_eq!(*texts.lock(), ["some value"]);
        assert_eq!(*numbers.lock(), [123]);
    }

    #[test]
    fn test_pull_success() {
        let router = ReactorRouter::new();
        let _s = router.on_pull(|| "some value".to_string()).unwrap();

        let results = router.pull::<String>().fetch().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_deref().ok(), Some("some value"));
    }

    #[test]
    fn test_pull_failure_is_captured() {
        let router = ReactorRouter::new();
        let _s = router
            .on_try_pull(|| Err::<String, _>("expected failure"))
            .unwrap();

        let results = router.pull::<String>().fetch().unwrap();
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(ReactorError::Failed(error)) => assert_eq!(error.to_string(), "expected failure"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_reactor_does_not_affect_siblings() {
        let router = ReactorRouter::new();
        let _ok = router.on_pull(|| "first".to_string()).unwrap();
        let _panics = router.on_pull::<String>(|| panic!("reactor exploded")).unwrap();
        let _ok2 = router.on_pull(|| "third".to_string()).unwrap();

        let results = router.pull::<String>().fetch().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref().ok(), Some("first"));
        assert!(matches!(&results[1], Err(ReactorError::Panicked(m)) if m == "reactor exploded"));
        assert_eq!(results[2].as_deref().ok(), Some("third"));

        let recovered: Vec<String> = results
            .into_iter()
            .map(|r| r.recover(|_| "fallback".to_string()).unwrap())
            .collect();
        assert_eq!(recovered, ["first", "fallback", "third"]);
    }

    #[test]
    #[should_panic(expected = "reactor exploded")]
    fn test_panics_propagate_when_not_caught() {
        let router = ReactorRouter::with_options(RouterOptions {
            catch_panics: false,
            ..RouterOptions::default()
        });
        let _s = router.on_pull::<String>(|| panic!("reactor exploded")).unwrap();
        let _ = router.pull::<String>().fetch();
    }

    #[test]
    fn test_query_responder() {
        let router = ReactorRouter::new();
        let _s = router
            .on_query(|value: &String| format!("some {value}"))
            .unwrap();

        let results = router
            .pull::<String>()
            .with_query("value".to_string())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_deref().ok(), Some("some value"));
    }

    #[test]
    fn test_query_filters_by_result_type() {
        let router = ReactorRouter::new();
        let _text = router.on_respond(|value: &String| format!("text {value}")).unwrap();
        let _len = router.on_respond(|value: &String| value.len() as i32).unwrap();

        let lengths = router.query::<String, i32>("four".to_string()).unwrap();
        assert_eq!(lengths.len(), 1);
        assert_eq!(lengths[0].as_ref().ok(), Some(&4));

        let missing = router.query::<String, bool>("four".to_string());
        assert!(matches!(missing, Err(RouterError::NoReactors { protocol: Protocol::Query, .. })));
    }

    #[test]
    fn test_query_failure_is_captured() {
        let router = ReactorRouter::new();
        let _s = router
            .on_try_query(|value: &i32| {
                if *value < 0 {
                    Err(format!("negative: {value}"))
                } else {
                    Ok(value.to_string())
                }
            })
            .unwrap();

        let ok = router.query::<i32, String>(3).unwrap();
        assert_eq!(ok[0].as_deref().ok(), Some("3"));
        let failed = router.query::<i32, String>(-1).unwrap();
        assert!(matches!(&failed[0], Err(ReactorError::Failed(e)) if e.to_string() == "negative: -1"));
    }

    #[test]
    fn test_failing_query_does_not_affect_siblings() {
        let router = silent();
        let _ok = router.on_query(|n: &i32| format!("ok {n}")).unwrap();
        let _err = router
            .on_try_query(|n: &i32| Err::<String, _>(format!("rejected {n}")))
            .unwrap();
        let _panics = router
            .on_query::<i32, String>(|_| panic!("responder exploded"))
            .unwrap();

        let results = router.query::<i32, String>(7).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref().ok(), Some("ok 7"));
        assert!(matches!(&results[1], Err(ReactorError::Failed(e)) if e.to_string() == "rejected 7"));
        assert!(matches!(&results[2], Err(ReactorError::Panicked(m)) if m == "responder exploded"));
    }

    #[test]
    fn test_supertype_reactor_receives_subtype() {
        let router = ReactorRouter::new();
        let (texts, text_sink) = recorder::<CharSequence>();
        let (numbers, number_sink) = recorder::<Number>();
        let _a = router.on_push(text_sink).unwrap();
        let _b = router.on_push(number_sink).unwrap();

        router.push("some value".to_string()).unwrap();
        router.push(7i64).unwrap();
        router.push(1.5f32).unwrap();

        assert_eq!(*texts.lock(), [CharSequence::new("some value")]);
        assert_eq!(*numbers.lock(), [Number::Long(7), Number::Float(1.5)]);
    }

    #[test]
    fn test_subtype_reactor_ignores_supertype() {
        let router = ReactorRouter::new();
        let _s = router.on_push(|_: &String| {}).unwrap();
        assert!(router.push(CharSequence::new("x")).is_err());
    }

    #[test]
    fn test_push_fans_out_across_buckets() {
        let router = silent();
        let order = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&order);
        let _a = router.on_push(move |_: &CharSequence| sink.lock().push("sequence")).unwrap();
        let sink = Arc::clone(&order);
        let _b = router.on_push(move |_: &String| sink.lock().push("string 1")).unwrap();
        let sink = Arc::clone(&order);
        let _c = router.on_push(move |_: &String| sink.lock().push("string 2")).unwrap();
        let sink = Arc::clone(&order);
        let _d = router
            .attach_push(&Shape::new(RawType::named("Object")), move |_| sink.lock().push("object"))
            .unwrap();

        assert_eq!(router.push("x".to_string()).unwrap(), 4);
        assert_eq!(*order.lock(), ["sequence", "string 1", "string 2", "object"]);
    }

    #[test]
    fn test_generic_containers_are_invariant() {
        let router = ReactorRouter::new();
        let (strings, string_sink) = recorder::<A<String>>();
        let (ints, int_sink) = recorder::<A<i32>>();
        let _a = router.on_push(string_sink).unwrap();
        let _b = router.on_push(int_sink).unwrap();

        router.push(A("some value".to_string())).unwrap();
        router.push(A(123i32)).unwrap();
        assert!(router.push(A(1.0f64)).is_err());

        assert_eq!(*strings.lock(), [A("some value".to_string())]);
        assert_eq!(*ints.lock(), [A(123)]);
    }

    #[test]
    fn test_generic_containers_for_pull() {
        let router = ReactorRouter::new();
        let _a = router.on_pull(|| A("some value".to_string())).unwrap();
        let _b = router.on_pull(|| A(123i32)).unwrap();

        let strings = router.pull::<A<String>>().fetch().unwrap();
        let ints = router.pull::<A<i32>>().fetch().unwrap();

        assert_eq!(strings.len(), 1);
        assert_eq!(ints.len(), 1);
        assert_eq!(strings[0].as_ref().ok(), Some(&A("some value".to_string())));
        assert_eq!(ints[0].as_ref().ok(), Some(&A(123)));
    }

    #[test]
    fn test_pull_supertype_collects_subtypes() {
        let router = ReactorRouter::new();
        let _a = router.on_pull(|| "text".to_string()).unwrap();
        let _b = router.on_pull(|| CharSequence::new("sequence")).unwrap();

        let sequences = router.pull::<CharSequence>().fetch().unwrap();
        let texts: Vec<_> = sequences
            .into_iter()
            .map(|r| r.map(|s| s.to_string()).unwrap())
            .collect();
        assert_eq!(texts, ["text", "sequence"]);

        // A String request never sees a CharSequence producer.
        assert_eq!(router.pull::<String>().fetch().unwrap().len(), 1);
    }

    #[test]
    fn test_no_reactors_errors() {
        let router = ReactorRouter::new();
        assert!(matches!(
            router.push(1i32),
            Err(RouterError::NoReactors { protocol: Protocol::Push, .. })
        ));
        assert!(matches!(
            router.pull::<i32>().fetch(),
            Err(RouterError::NoReactors { protocol: Protocol::Pull, .. })
        ));
        assert!(matches!(
            router.query::<i32, String>(1),
            Err(RouterError::NoReactors { protocol: Protocol::Query, .. })
        ));
    }

    #[test]
    fn test_user_hierarchy_and_upcast() {
        let router = ReactorRouter::new();
        let (animals, sink) = recorder::<Animal>();
        let _s = router.on_push(sink).unwrap();

        // Undeclared, Dog is unrelated to Animal.
        assert!(router.push(Dog("rex")).is_err());

        router.declare(TypeDecl::class("Dog").extends(TypeDescriptor::plain("Animal")));
        assert_eq!(router.push(Dog("rex")).unwrap(), 1);
        assert_eq!(*animals.lock(), [Animal("rex")]);
    }

    #[test]
    fn test_push_without_view_is_not_delivered() {
        let router = silent();
        router.declare(TypeDecl::class("Stray").extends(TypeDescriptor::plain("Animal")));
        let (animals, sink) = recorder::<Animal>();
        let _animal = router.on_push(sink).unwrap();

        let result = router.push(Stray);
        assert!(matches!(result, Err(RouterError::Undelivered { skipped: 1, .. })));
        assert!(animals.lock().is_empty());

        let objects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&objects);
        let _object = router
            .attach_push(&Shape::new(RawType::named("Object")), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(router.push(Stray).unwrap(), 1);
        assert_eq!(objects.load(Ordering::SeqCst), 1);
        assert!(animals.lock().is_empty());
    }

    #[test]
    fn test_generic_supertype_need_not_be_declared() {
        let router = silent();
        router.declare(TypeDecl::class("Names").implements(TypeDescriptor::parameterized(
            "Box",
            [TypeDescriptor::plain("String")],
        )));

        let hits = Arc::new(Mutex::new(Vec::new()));
        let shapes = [
            ("raw", RawType::named("Box")),
            ("strings", RawType::parameterized("Box", [RawType::named("String")])),
            ("ints", RawType::parameterized("Box", [RawType::named("Int")])),
        ];
        let _subscriptions: Vec<_> = shapes
            .into_iter()
            .map(|(label, raw)| {
                let sink = Arc::clone(&hits);
                router
                    .attach_push(&Shape::new(raw), move |_| sink.lock().push(label))
                    .unwrap()
            })
            .collect();

        assert_eq!(router.push(Names).unwrap(), 2);
        assert_eq!(*hits.lock(), ["raw", "strings"]);
    }

    #[test]
    fn test_new_bucket_invalidates_cached_matches() {
        let router = ReactorRouter::new();
        let (sequences, sink) = recorder::<CharSequence>();
        let _a = router.on_push(sink).unwrap();
        assert_eq!(router.push("a".to_string()).unwrap(), 1);

        let (strings, sink) = recorder::<String>();
        let _b = router.on_push(sink).unwrap();
        assert_eq!(router.push("b".to_string()).unwrap(), 2);

        assert_eq!(sequences.lock().len(), 2);
        assert_eq!(*strings.lock(), ["b"]);
    }

    #[test]
    fn test_wildcard_bucket() {
        let router = silent();
        let reached = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reached);
        let shape = Shape::new(RawType::parameterized(
            "List",
            [RawType::subtype_of(RawType::named("Number"))],
        ));
        let _s = router
            .attach_push(&shape, move |payload| {
                assert!(payload.downcast_ref::<IntList>().is_some());
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        router.push(IntList(vec![1, 2])).unwrap();
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shape_resolved_in_context() {
        let router = silent();
        let inbox = TypeDecl::class("Inbox").param("E");
        let e = inbox.variable("E");
        router.declare(inbox);

        let context = TypeDescriptor::parameterized("Inbox", [TypeDescriptor::plain("String")]);
        let shape = Shape::new(RawType::parameterized("A", [RawType::from(e.clone())]))
            .in_context(context);
        let subscription = router.attach_push(&shape, |_| {}).unwrap();
        assert_eq!(
            subscription.descriptor(),
            &TypeDescriptor::parameterized("A", [TypeDescriptor::plain("String")])
        );
        assert_eq!(router.push(A("hi".to_string())).unwrap(), 1);

        let unresolved = router.attach_push(&Shape::new(RawType::from(e)), |_| {});
        assert!(matches!(
            unresolved,
            Err(RouterError::Type(TypeError::UnresolvedVariable { .. }))
        ));
    }

    #[test]
    fn test_invalid_shapes_rejected_before_storing() {
        let router = silent();
        let mixed = Shape::new(RawType::Wildcard {
            upper: vec![RawType::named("Number")],
            lower: vec![RawType::named("Int")],
        });
        assert!(matches!(
            router.attach_push(&mixed, |_| {}),
            Err(RouterError::Type(TypeError::MixedBounds { .. }))
        ));

        let arity = Shape::new(RawType::parameterized(
            "List",
            [RawType::named("Int"), RawType::named("Int")],
        ));
        assert!(matches!(
            router.attach_push(&arity, |_| {}),
            Err(RouterError::Type(TypeError::ArityMismatch { .. }))
        ));
        assert_eq!(router.stats(), RouterStats::default());
    }

    #[test]
    fn test_reactor_count_notifications() {
        let router = ReactorRouter::new();
        let (counts, sink) = recorder::<ReactorCount>();
        let _observer = router.on_reactor_count(sink).unwrap();

        let push = router.on_push(|_: &String| {}).unwrap();
        let _pull = router.on_pull(|| "x".to_string()).unwrap();
        push.detach();
        push.detach();

        let string = TypeDescriptor::plain("String");
        assert_eq!(
            *counts.lock(),
            [
                ReactorCount::new(string.clone(), 1, 0, 0),
                ReactorCount::new(string.clone(), 1, 1, 0),
                ReactorCount::new(string.clone(), 0, 1, 0),
            ]
        );
        assert_eq!(router.reactor_count(&string), Some(ReactorCount::new(string, 0, 1, 0)));
        assert_eq!(
            router.reactor_count(&TypeDescriptor::plain("ReactorCount")).map(|c| c.push),
            Some(1)
        );
    }

    #[test]
    fn test_unreported_types_are_not_counted() {
        let router = ReactorRouter::new();
        router.declare(
            TypeDecl::class("Heartbeat").implements(TypeDescriptor::plain("Unreported")),
        );
        let (counts, sink) = recorder::<ReactorCount>();
        let _observer = router.on_reactor_count(sink).unwrap();

        let _s = router.on_push(|_: &Heartbeat| {}).unwrap();
        assert!(counts.lock().is_empty());

        let _t = router.on_push(|_: &bool| {}).unwrap();
        assert_eq!(counts.lock().len(), 1);
    }

    #[test]
    fn test_stats() {
        let router = ReactorRouter::new();
        let _a = router.on_push(|_: &String| {}).unwrap();
        let _b = router.on_pull(|| 1i32).unwrap();
        let _c = router.on_query(|_: &String| 1i32).unwrap();
        let d = router.on_push(|_: &bool| {}).unwrap();
        d.detach();

        assert_eq!(
            router.stats(),
            RouterStats {
                buckets: 3,
                push: 1,
                pull: 1,
                query: 1,
            }
        );
    }

    #[test]
    fn test_subscriptions_as_detach_objects() {
        let router = silent();
        let subscriptions: Vec<Box<dyn Detach>> = vec![
            Box::new(router.on_push(|_: &String| {}).unwrap()),
            Box::new(router.on_push(|_: &i32| {}).unwrap()),
        ];
        for subscription in &subscriptions {
            assert!(subscription.detach());
        }
        assert!(subscriptions.iter().all(|s| s.is_detached()));
        assert_eq!(router.stats().push, 0);
    }

    #[test]
    fn test_reentrant_registration_from_reactor() {
        let router = silent();
        let inner = router.clone();
        let spawned = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&spawned);
        let _s = router
            .on_push(move |_: &String| {
                keep.lock().push(inner.on_push(|_: &i32| {}).unwrap());
            })
            .unwrap();

        router.push("go".to_string()).unwrap();
        assert_eq!(router.push(1i32).unwrap(), 1);
        assert_eq!(spawned.lock().len(), 1);
    }

    #[test]
    fn test_concurrent_dispatch_and_detach() {
        let router = silent();
        let delivered = Arc::new(AtomicUsize::new(0));
        let subscriptions: Vec<_> = (0..64)
            .map(|_| {
                let delivered = Arc::clone(&delivered);
                router
                    .on_push(move |_: &i32| {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    })
                    .unwrap()
            })
            .collect();
        let _anchor = router.on_push(|_: &Number| {}).unwrap();

        thread::scope(|scope| {
            for _ in 0..4 {
                let router = router.clone();
                scope.spawn(move || {
                    for i in 0..200 {
                        let reached = router.push(i).unwrap();
                        assert!((1..=65).contains(&reached));
                    }
                });
            }
            scope.spawn(|| {
                for subscription in &subscriptions {
                    subscription.detach();
                }
            });
        });

        assert_eq!(router.push(0i32).unwrap(), 1);
        assert!(delivered.load(Ordering::Relaxed) <= 64 * 800);
        assert_eq!(router.stats().push, 1);
    }
}
