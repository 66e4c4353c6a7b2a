//! An ordered container with constant-time removal through handles.
//!
//! [`DetachableRegistry`] is a doubly linked list of shared nodes. Pushing
//! returns a [`DetachableHandle`] that unlinks exactly that node. Iteration is
//! live and weakly consistent:
//!
//! - items are yielded in insertion order;
//! - items pushed while an iterator is running may or may not be seen;
//! - an item whose detach has completed is never yielded afterwards;
//! - detaching the item an iterator is parked on does not end the iteration.
//!
//! Structural changes (push and detach) are serialized by one lock; iteration
//! only takes short per-node read locks and never blocks on other readers.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

struct Node<T> {
    value: T,
    position: usize,
    next: RwLock<Option<Arc<Node<T>>>>,
    prev: Mutex<Weak<Node<T>>>,
    detached: AtomicBool,
}

struct Ends<T> {
    head: Option<Arc<Node<T>>>,
    tail: Option<Arc<Node<T>>>,
    next_position: usize,
}

struct Inner<T> {
    ends: Mutex<Ends<T>>,
    size: AtomicUsize,
}

impl<T> Drop for Inner<T> {
    // Unlink iteratively so long chains do not overflow the stack.
    fn drop(&mut self) {
        let ends = self.ends.get_mut();
        ends.tail = None;
        let mut current = ends.head.take();
        while let Some(node) = current {
            current = match Arc::into_inner(node) {
                Some(node) => node.next.into_inner(),
                None => None,
            };
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered, concurrently iterable container with O(1) push and detach.
pub struct DetachableRegistry<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DetachableRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for DetachableRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DetachableRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                ends: Mutex::new(Ends {
                    head: None,
                    tail: None,
                    next_position: 0,
                }),
                size: AtomicUsize::new(0),
            }),
        }
    }

    /// Appends `item` and returns its handle and insertion position.
    ///
    /// Positions increase monotonically for the lifetime of the registry.
    pub fn push(&self, item: T) -> (DetachableHandle<T>, usize) {
        let mut ends = self.inner.ends.lock();
        let position = ends.next_position;
        ends.next_position += 1;

        let node = Arc::new(Node {
            value: item,
            position,
            next: RwLock::new(None),
            prev: Mutex::new(Weak::new()),
            detached: AtomicBool::new(false),
        });

        match ends.tail.take() {
            Some(tail) => {
                *node.prev.lock() = Arc::downgrade(&tail);
                *tail.next.write() = Some(Arc::clone(&node));
            }
            None => ends.head = Some(Arc::clone(&node)),
        }
        ends.tail = Some(Arc::clone(&node));
        self.inner.size.fetch_add(1, Ordering::Release);

        let handle = DetachableHandle {
            registry: Arc::downgrade(&self.inner),
            node: Arc::downgrade(&node),
        };
        (handle, position)
    }

    /// Number of attached items.
    pub fn len(&self) -> usize {
        self.inner.size.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A live iterator starting at the current head.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            next: self.inner.ends.lock().head.clone(),
        }
    }
}

impl<T: Clone> IntoIterator for &DetachableRegistry<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for DetachableRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachableRegistry")
            .field("len", &self.len())
            .finish()
    }
}

fn unlink<T>(inner: &Inner<T>, node: &Arc<Node<T>>) {
    let mut ends = inner.ends.lock();

    let prev = node.prev.lock().upgrade();
    // The forward link stays in place so an iterator parked on this node can
    // continue to its successor.
    let next = node.next.read().clone();

    match &prev {
        Some(prev) => *prev.next.write() = next.clone(),
        None => {
            if ends.head.as_ref().is_some_and(|head| Arc::ptr_eq(head, node)) {
                ends.head = next.clone();
            }
        }
    }
    match &next {
        Some(next) => {
            *next.prev.lock() = prev.as_ref().map(Arc::downgrade).unwrap_or_default();
        }
        None => {
            if ends.tail.as_ref().is_some_and(|tail| Arc::ptr_eq(tail, node)) {
                ends.tail = prev;
            }
        }
    }

    *node.prev.lock() = Weak::new();
    inner.size.fetch_sub(1, Ordering::Release);
}

// ============================================================================
// Handles
// ============================================================================

/// Object-safe detach contract, used where the item type is erased.
pub trait Detach: Send + Sync {
    /// Removes the item. Returns `true` only for the call that removed it.
    fn detach(&self) -> bool;

    /// Returns `true` once the item has been removed.
    fn is_detached(&self) -> bool;
}

/// Removes one item from its [`DetachableRegistry`].
///
/// Dropping a handle does not detach the item.
pub struct DetachableHandle<T> {
    registry: Weak<Inner<T>>,
    node: Weak<Node<T>>,
}

impl<T> DetachableHandle<T> {
    /// Removes the item; later calls are no-ops returning `false`.
    pub fn detach(&self) -> bool {
        let (Some(registry), Some(node)) = (self.registry.upgrade(), self.node.upgrade()) else {
            return false;
        };
        if node.detached.swap(true, Ordering::AcqRel) {
            return false;
        }
        unlink(&registry, &node);
        true
    }

    pub fn is_detached(&self) -> bool {
        self.node
            .upgrade()
            .is_none_or(|node| node.detached.load(Ordering::Acquire))
    }

    /// The insertion position returned by [`DetachableRegistry::push`].
    pub fn position(&self) -> Option<usize> {
        self.node.upgrade().map(|node| node.position)
    }
}

impl<T: Send + Sync> Detach for DetachableHandle<T> {
    fn detach(&self) -> bool {
        DetachableHandle::detach(self)
    }

    fn is_detached(&self) -> bool {
        DetachableHandle::is_detached(self)
    }
}

impl<T> fmt::Debug for DetachableHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachableHandle")
            .field("position", &self.position())
            .field("detached", &self.is_detached())
            .finish()
    }
}

// ============================================================================
// Iteration
// ============================================================================

/// Live iterator over a [`DetachableRegistry`]. See the module docs for its
/// consistency guarantees.
///
/// Detached nodes keep their forward link, so a node the iterator is parked
/// on, and any detached nodes chained after it, stay allocated until the
/// iterator moves past them. Those nodes are skipped, never yielded.
pub struct Iter<T> {
    next: Option<Arc<Node<T>>>,
}

impl<T: Clone> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let node = self.next.take()?;
            self.next = node.next.read().clone();
            if !node.detached.load(Ordering::Acquire) {
                return Some(node.value.clone());
            }
        }
    }
}
