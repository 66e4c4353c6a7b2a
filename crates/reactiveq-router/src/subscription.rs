//! Detach handles returned by reactor registration.

use std::fmt;
use std::sync::{Arc, Weak};

use reactiveq_core::{Detach, DetachableHandle, TypeDescriptor};
use tracing::debug;

use crate::reactor::{Protocol, Reactor};
use crate::router::{Bucket, ReactorRouter, RouterShared};

/// Keeps a registered reactor attached until [`detach`](Self::detach) is
/// called.
///
/// Dropping a subscription leaves the reactor registered.
#[must_use = "a reactor can only be removed through its subscription"]
pub struct Subscription {
    handle: DetachableHandle<Arc<Reactor>>,
    router: Weak<RouterShared>,
    bucket: Arc<Bucket>,
    protocol: Protocol,
}

impl Subscription {
    pub(crate) fn new(
        handle: DetachableHandle<Arc<Reactor>>,
        router: Weak<RouterShared>,
        bucket: Arc<Bucket>,
        protocol: Protocol,
    ) -> Self {
        Self {
            handle,
            router,
            bucket,
            protocol,
        }
    }

    /// Removes the reactor. Once this returns, no later dispatch reaches it;
    /// a dispatch already running may still do so.
    ///
    /// Returns `true` only for the call that removed it.
    pub fn detach(&self) -> bool {
        if !self.handle.detach() {
            return false;
        }
        debug!(
            protocol = %self.protocol,
            descriptor = %self.bucket.key(),
            "Detached reactor"
        );
        if let Some(shared) = self.router.upgrade() {
            ReactorRouter::from_shared(shared).report(&self.bucket);
        }
        true
    }

    pub fn is_detached(&self) -> bool {
        self.handle.is_detached()
    }

    /// The bucket key the reactor was registered under.
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.bucket.key()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl Detach for Subscription {
    fn detach(&self) -> bool {
        Subscription::detach(self)
    }

    fn is_detached(&self) -> bool {
        Subscription::is_detached(self)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("protocol", &self.protocol)
            .field("descriptor", &format_args!("{}", self.bucket.key()))
            .field("detached", &self.is_detached())
            .finish()
    }
}
