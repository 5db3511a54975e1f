//! The blocking queue abstraction consumed by the worker threads

use crate::core::cancellation::CancellationToken;
use crate::queue::QueueResult;
use std::time::Duration;

/// Outcome of a bounded add that did not fault
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub enum AddOutcome<T> {
    Added,
    /// The deadline passed while the queue was full; the item is handed back
    TimedOut(T),
}

impl<T> AddOutcome<T> {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added)
    }

    /// The rejected item, if the add timed out
    pub fn into_rejected(self) -> Option<T> {
        match self {
            AddOutcome::Added => None,
            AddOutcome::TimedOut(item) => Some(item),
        }
    }
}

/// Thread-safe FIFO queue with blocking, timeout and cancellation semantics
///
/// `timeout` of `None` waits indefinitely; `Some(Duration::ZERO)` never
/// blocks. A fired token always yields [`QueueError::Cancelled`], never a
/// silent timeout.
///
/// [`QueueError::Cancelled`]: crate::queue::QueueError::Cancelled
pub trait BlockingQueue<T>: Send + Sync {
    /// Add an item, waiting for space while the queue is at capacity
    ///
    /// Faults with `Disposed` or `AddingCompleted` regardless of timeout.
    fn try_add(
        &self,
        item: T,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> QueueResult<AddOutcome<T>>;

    /// Add an item ignoring the capacity bound; never blocks
    fn add_forced(&self, item: T) -> QueueResult<()>;

    /// Remove the oldest item, waiting while the queue is empty
    ///
    /// Returns `Ok(None)` on timeout, and immediately once adding has been
    /// completed and the queue is empty.
    fn try_take(&self, timeout: Option<Duration>, token: &CancellationToken)
        -> QueueResult<Option<T>>;

    /// Stop accepting items; takers drain what remains. One-way.
    fn complete_adding(&self) -> QueueResult<()>;

    /// Drop all items and release every waiter with `Disposed`. One-way.
    fn dispose(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity bound, `None` when unbounded
    fn capacity(&self) -> Option<usize>;

    fn is_adding_completed(&self) -> bool;

    fn is_disposed(&self) -> bool;

    /// True once adding is completed and every item has been taken
    fn is_completed(&self) -> bool {
        self.is_adding_completed() && self.is_empty()
    }
}
