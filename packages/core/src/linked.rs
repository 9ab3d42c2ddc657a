//! Generic doubly-linked queue guarded by one coarse lock.
//!
//! Nodes live in a slot arena owned by the [`Chain`]. Links between nodes, the
//! tail reference and every [`NodeHandle`] are slot positions, never owners, so
//! detaching a node can not leave anything dangling: a stale handle simply stops
//! resolving.
//!
//! [`LinkedQueue`] wraps a chain in a `Mutex` together with optional sidecar
//! state `S` that must change atomically with the chain (the job queue keeps its
//! identifier index there). Every public operation takes the lock exactly once;
//! composite operations go through [`LinkedQueue::with_lock`].

use std::fmt;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::QueueError;

/// Unique identifier for a queue instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(pub Ulid);

impl QueueId {
    /// Create a new unique queue ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for QueueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of one node inside one specific queue.
///
/// A handle stays valid until its node is detached. After that the slot may be
/// reused, but with a new generation, so the old handle is rejected instead of
/// resolving to an unrelated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    queue: QueueId,
    slot: usize,
    generation: u64,
}

impl NodeHandle {
    /// The queue this handle was issued by.
    pub fn queue_id(&self) -> QueueId {
        self.queue
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}.{}", self.queue, self.slot, self.generation)
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    node: Option<Node<T>>,
}

/// The unsynchronized chain behind a [`LinkedQueue`].
///
/// None of these methods lock. They are reachable from outside only through
/// [`LinkedQueue::with_lock`], which hands out the chain while the queue's lock
/// is held.
#[derive(Debug)]
pub struct Chain<T> {
    id: QueueId,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    count: usize,
}

impl<T> Chain<T> {
    fn new(id: QueueId) -> Self {
        Self {
            id,
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            count: 0,
        }
    }

    /// Identity of the owning queue.
    pub fn id(&self) -> QueueId {
        self.id
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn node(&self, slot: usize) -> Option<&Node<T>> {
        self.slots.get(slot).and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(slot).and_then(|s| s.node.as_mut())
    }

    fn handle(&self, slot: usize) -> NodeHandle {
        NodeHandle {
            queue: self.id,
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Appends a value at the tail.
    pub fn push_back(&mut self, value: T) -> NodeHandle {
        let slot = self.alloc(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(old_tail) => {
                if let Some(node) = self.node_mut(old_tail) {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.count += 1;
        self.handle(slot)
    }

    /// Inserts a value at the head.
    pub fn push_front(&mut self, value: T) -> NodeHandle {
        let slot = self.alloc(Node {
            value,
            prev: None,
            next: self.head,
        });
        match self.head {
            Some(old_head) => {
                if let Some(node) = self.node_mut(old_head) {
                    node.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.count += 1;
        self.handle(slot)
    }

    /// Detaches and returns the head value.
    pub fn pop_front(&mut self) -> Result<T, QueueError> {
        let head = self.head.ok_or(QueueError::Underflow {
            operation: "pop_front",
        })?;
        self.unlink(head)
    }

    /// Detaches and returns the tail value.
    pub fn pop_back(&mut self) -> Result<T, QueueError> {
        let tail = self.tail.ok_or(QueueError::Underflow {
            operation: "pop_back",
        })?;
        self.unlink(tail)
    }

    /// Detaches the node behind `handle` and returns its value.
    ///
    /// Boundary nodes go through `pop_front`/`pop_back`; interior nodes are
    /// spliced out by reconnecting their neighbors.
    pub fn remove(&mut self, handle: NodeHandle) -> Result<T, QueueError> {
        if self.is_empty() {
            return Err(QueueError::InvalidHandle {
                handle,
                reason: "queue is empty",
            });
        }
        let slot = self.resolve(handle)?;

        if Some(slot) == self.head {
            return self.pop_front();
        }
        if Some(slot) == self.tail {
            return self.pop_back();
        }

        let interior = self
            .node(slot)
            .is_some_and(|node| node.prev.is_some() && node.next.is_some());
        if !interior {
            return Err(QueueError::InvalidHandle {
                handle,
                reason: "node is not part of the queue",
            });
        }
        self.unlink(slot)
    }

    fn unlink(&mut self, slot: usize) -> Result<T, QueueError> {
        let entry = &mut self.slots[slot];
        let node = entry.node.take().ok_or_else(|| {
            QueueError::Corrupted(format!("slot {slot} is linked but vacant"))
        })?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot);

        match node.prev {
            Some(prev) => {
                if let Some(p) = self.node_mut(prev) {
                    p.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(n) = self.node_mut(next) {
                    n.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        self.count -= 1;
        Ok(node.value)
    }

    fn resolve(&self, handle: NodeHandle) -> Result<usize, QueueError> {
        if handle.queue != self.id {
            return Err(QueueError::InvalidHandle {
                handle,
                reason: "handle belongs to another queue",
            });
        }
        match self.slots.get(handle.slot) {
            Some(slot) if slot.generation == handle.generation && slot.node.is_some() => {
                Ok(handle.slot)
            }
            Some(_) => Err(QueueError::InvalidHandle {
                handle,
                reason: "node has already been detached",
            }),
            None => Err(QueueError::InvalidHandle {
                handle,
                reason: "handle does not resolve to a node",
            }),
        }
    }

    /// True if `handle` designates a node currently linked in this chain.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Value behind `handle`.
    pub fn get(&self, handle: NodeHandle) -> Result<&T, QueueError> {
        let slot = self.resolve(handle)?;
        self.node(slot)
            .map(|node| &node.value)
            .ok_or(QueueError::InvalidHandle {
                handle,
                reason: "handle does not resolve to a node",
            })
    }

    /// Mutable value behind `handle`.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Result<&mut T, QueueError> {
        let slot = self.resolve(handle)?;
        self.node_mut(slot)
            .map(|node| &mut node.value)
            .ok_or(QueueError::InvalidHandle {
                handle,
                reason: "handle does not resolve to a node",
            })
    }

    pub fn front(&self) -> Result<&T, QueueError> {
        self.head
            .and_then(|slot| self.node(slot))
            .map(|node| &node.value)
            .ok_or(QueueError::Underflow { operation: "front" })
    }

    pub fn back(&self) -> Result<&T, QueueError> {
        self.tail
            .and_then(|slot| self.node(slot))
            .map(|node| &node.value)
            .ok_or(QueueError::Underflow { operation: "back" })
    }

    /// Handle of the head node, if any.
    pub fn front_handle(&self) -> Option<NodeHandle> {
        self.head.map(|slot| self.handle(slot))
    }

    /// Handle of the tail node, if any.
    pub fn back_handle(&self) -> Option<NodeHandle> {
        self.tail.map(|slot| self.handle(slot))
    }

    /// Handle of the node after `handle`, or `None` at the tail or for a stale handle.
    pub fn next_handle(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let slot = self.resolve(handle).ok()?;
        self.node(slot)?.next.map(|next| self.handle(next))
    }

    /// Handle of the node before `handle`, or `None` at the head or for a stale handle.
    pub fn prev_handle(&self, handle: NodeHandle) -> Option<NodeHandle> {
        let slot = self.resolve(handle).ok()?;
        self.node(slot)?.prev.map(|prev| self.handle(prev))
    }

    /// Borrowing iterator from head to tail.
    pub fn iter(&self) -> ChainIter<'_, T> {
        ChainIter {
            chain: self,
            cursor: self.head,
            remaining: self.count,
        }
    }

    /// Drops every node. Outstanding handles stop resolving.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.head = None;
        self.tail = None;
        self.count = 0;
    }

    /// Walks the chain and verifies links, tail and count.
    pub fn check_invariants(&self) -> Result<(), QueueError> {
        if (self.count == 0) != (self.head.is_none() && self.tail.is_none()) {
            return Err(QueueError::Corrupted(format!(
                "count {} disagrees with head {:?} / tail {:?}",
                self.count, self.head, self.tail
            )));
        }

        let mut seen = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self
                .node(slot)
                .ok_or_else(|| QueueError::Corrupted(format!("slot {slot} is linked but vacant")))?;
            if node.prev != prev {
                return Err(QueueError::Corrupted(format!(
                    "slot {slot} points back to {:?}, expected {:?}",
                    node.prev, prev
                )));
            }
            seen += 1;
            if seen > self.count {
                return Err(QueueError::Corrupted(format!(
                    "chain is longer than its count {}",
                    self.count
                )));
            }
            prev = Some(slot);
            cursor = node.next;
        }

        if seen != self.count {
            return Err(QueueError::Corrupted(format!(
                "walked {seen} nodes but count is {}",
                self.count
            )));
        }
        if prev != self.tail {
            return Err(QueueError::Corrupted(format!(
                "tail is {:?} but the last reachable node is {:?}",
                self.tail, prev
            )));
        }
        Ok(())
    }
}

/// Borrowing iterator over a [`Chain`].
pub struct ChainIter<'a, T> {
    chain: &'a Chain<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.chain.node(self.cursor?)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

#[derive(Debug)]
struct Locked<T, S> {
    chain: Chain<T>,
    state: S,
}

/// Thread-safe doubly-linked queue.
///
/// `S` is sidecar state guarded by the same lock as the chain. Operations are
/// not reentrant: calling back into the same queue from inside
/// [`with_lock`](Self::with_lock), or while a [`Peek`] guard is alive, deadlocks.
#[derive(Debug)]
pub struct LinkedQueue<T, S = ()> {
    id: QueueId,
    inner: Mutex<Locked<T, S>>,
}

impl<T> LinkedQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::with_state(())
    }
}

impl<T> Default for LinkedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> LinkedQueue<T, S> {
    /// Create an empty queue carrying `state` under its lock.
    pub fn with_state(state: S) -> Self {
        let id = QueueId::new();
        Self {
            id,
            inner: Mutex::new(Locked {
                chain: Chain::new(id),
                state,
            }),
        }
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Locked<T, S>> {
        // Chain mutations complete before anything that can panic, so the data
        // behind a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside one critical section with the chain and the sidecar state.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut Chain<T>, &mut S) -> R) -> R {
        let mut guard = self.lock();
        let Locked { chain, state } = &mut *guard;
        f(chain, state)
    }

    pub fn push_back(&self, value: T) -> NodeHandle {
        self.lock().chain.push_back(value)
    }

    pub fn push_front(&self, value: T) -> NodeHandle {
        self.lock().chain.push_front(value)
    }

    pub fn pop_front(&self) -> Result<T, QueueError> {
        self.lock().chain.pop_front()
    }

    pub fn pop_back(&self) -> Result<T, QueueError> {
        self.lock().chain.pop_back()
    }

    /// Detach the node behind `handle` and return its value.
    pub fn remove(&self, handle: NodeHandle) -> Result<T, QueueError> {
        self.lock().chain.remove(handle)
    }

    pub fn size(&self) -> usize {
        self.lock().chain.len()
    }

    pub fn empty(&self) -> bool {
        self.lock().chain.is_empty()
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.lock().chain.contains(handle)
    }

    pub fn clear(&self) {
        self.lock().chain.clear();
    }

    /// Guarded reference to the head value. The queue stays locked until the
    /// guard is dropped.
    pub fn front(&self) -> Result<Peek<'_, T, S>, QueueError> {
        let guard = self.lock();
        let handle = guard
            .chain
            .front_handle()
            .ok_or(QueueError::Underflow { operation: "front" })?;
        Ok(Peek { guard, handle })
    }

    /// Guarded reference to the tail value. The queue stays locked until the
    /// guard is dropped.
    pub fn back(&self) -> Result<Peek<'_, T, S>, QueueError> {
        let guard = self.lock();
        let handle = guard
            .chain
            .back_handle()
            .ok_or(QueueError::Underflow { operation: "back" })?;
        Ok(Peek { guard, handle })
    }

    /// Verify the chain invariants under the lock.
    pub fn check_invariants(&self) -> Result<(), QueueError> {
        self.lock().chain.check_invariants()
    }
}

impl<T: Clone, S> LinkedQueue<T, S> {
    pub fn front_cloned(&self) -> Result<T, QueueError> {
        self.lock().chain.front().cloned()
    }

    pub fn back_cloned(&self) -> Result<T, QueueError> {
        self.lock().chain.back().cloned()
    }

    /// Consistent head-to-tail copy taken under a single lock acquisition.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().chain.iter().cloned().collect()
    }

    /// Head-to-tail traversal that locks only while reading each position.
    ///
    /// The lock is not held across the traversal. If other threads mutate the
    /// queue meanwhile, the walk may mix old and new states or stop early when
    /// the node it is positioned on gets detached. Callers that need a
    /// consistent view must synchronize externally or use [`snapshot`](Self::snapshot).
    pub fn iter(&self) -> Iter<'_, T, S> {
        let cursor = self.lock().chain.front_handle();
        Iter {
            queue: self,
            cursor,
        }
    }
}

/// Locked view of a boundary value, returned by [`LinkedQueue::front`] and
/// [`LinkedQueue::back`].
pub struct Peek<'a, T, S> {
    guard: MutexGuard<'a, Locked<T, S>>,
    handle: NodeHandle,
}

impl<T, S> Peek<'_, T, S> {
    /// Handle of the node being viewed.
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }
}

impl<T, S> Deref for Peek<'_, T, S> {
    type Target = T;

    fn deref(&self) -> &T {
        // The handle was resolved under this same guard and nothing can detach
        // the node while it is held.
        self.guard
            .chain
            .get(self.handle)
            .expect("peeked node stays linked while the guard is held")
    }
}

impl<T: fmt::Debug, S> fmt::Debug for Peek<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peek")
            .field("handle", &self.handle)
            .field("value", &**self)
            .finish()
    }
}

/// Cursor returned by [`LinkedQueue::iter`].
pub struct Iter<'a, T, S> {
    queue: &'a LinkedQueue<T, S>,
    cursor: Option<NodeHandle>,
}

impl<T: Clone, S> Iterator for Iter<'_, T, S> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let handle = self.cursor.take()?;
        let guard = self.queue.lock();
        let value = guard.chain.get(handle).ok()?.clone();
        self.cursor = guard.chain.next_handle(handle);
        Some(value)
    }
}
