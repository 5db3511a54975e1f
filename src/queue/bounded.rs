//! BoundedBlockingQueue - condition-variable backed FIFO with an optional bound
//!
//! One mutex guards the ordered store together with the completed and
//! disposed flags. Two condition variables carry the wake-ups:
//!
//! - `not_empty`: an item arrived, adding completed, or the queue was disposed
//! - `not_full`: an item left, adding completed, or the queue was disposed
//!
//! Every state change uses `notify_all`. Takers and peekers share `not_empty`,
//! so waking a single thread could hand the signal to a peeker and leave a
//! taker asleep.

use crate::core::cancellation::{CancellationRegistration, CancellationToken};
use crate::core::sync::lock_or_fail;
use crate::queue::store::{ItemStore, StoreKind};
use crate::queue::traits::{AddOutcome, BlockingQueue};
use crate::queue::{QueueError, QueueResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct QueueState<T> {
    store: Box<dyn ItemStore<T>>,
    adding_completed: bool,
    disposed: bool,
}

impl<T> QueueState<T> {
    fn ensure_accepting(&self) -> QueueResult<()> {
        if self.disposed {
            Err(QueueError::Disposed)
        } else if self.adding_completed {
            Err(QueueError::AddingCompleted)
        } else {
            Ok(())
        }
    }
}

struct QueueInner<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
    kind: StoreKind,
    // Mirrors of the guarded state for lock-free reads
    count: AtomicUsize,
    adding_completed: AtomicBool,
    disposed: AtomicBool,
}

impl<T> QueueInner<T> {
    /// Wake every waiter on both conditions
    ///
    /// Taking the lock orders the notification after any waiter's predicate
    /// check, so a waiter between "check" and "wait" cannot miss it.
    fn wake_all(&self) {
        let _guard = self.state.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

/// Thread-safe FIFO queue with an optional capacity bound
///
/// Cloning is not supported; share it behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use queue_processor::queue::{BlockingQueue, BoundedBlockingQueue};
/// use queue_processor::core::cancellation::CancellationToken;
/// use std::time::Duration;
///
/// let queue = BoundedBlockingQueue::new(Some(1));
/// queue.add("first").unwrap();
///
/// // Full: a zero timeout returns immediately with the item handed back
/// let outcome = queue
///     .try_add("second", Some(Duration::ZERO), &CancellationToken::none())
///     .unwrap();
/// assert_eq!(outcome.into_rejected(), Some("second"));
///
/// queue.complete_adding().unwrap();
/// assert_eq!(queue.take().unwrap(), Some("first"));
/// assert_eq!(queue.take().unwrap(), None); // drained
/// ```
pub struct BoundedBlockingQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T: Send + 'static> BoundedBlockingQueue<T> {
    /// Create an array-backed queue; `None` means unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self::with_store(capacity, StoreKind::Array)
    }

    pub fn unbounded() -> Self {
        Self::with_store(None, StoreKind::Array)
    }

    pub fn with_store(capacity: Option<usize>, kind: StoreKind) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    store: kind.create(capacity),
                    adding_completed: false,
                    disposed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
                kind,
                count: AtomicUsize::new(0),
                adding_completed: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn store_kind(&self) -> StoreKind {
        self.inner.kind
    }

    /// Add, waiting indefinitely for space
    pub fn add(&self, item: T) -> QueueResult<()> {
        match self.try_add(item, None, &CancellationToken::none())? {
            AddOutcome::Added => Ok(()),
            AddOutcome::TimedOut(_) => Err(QueueError::OperationFailed {
                message: "unbounded wait reported a timeout".to_string(),
            }),
        }
    }

    /// Take, waiting indefinitely; `None` means the queue is drained
    pub fn take(&self) -> QueueResult<Option<T>> {
        self.try_take(None, &CancellationToken::none())
    }

    /// Look at the oldest item without removing it
    ///
    /// Waits like [`BlockingQueue::try_take`].
    pub fn try_peek(
        &self,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> QueueResult<Option<T>>
    where
        T: Clone,
    {
        let deadline = deadline_after(timeout);
        let _registration = self.register_wake(token);
        let mut state = self.lock()?;
        loop {
            if state.disposed {
                return Err(QueueError::Disposed);
            }
            if token.is_cancelled() {
                return Err(QueueError::Cancelled);
            }
            if let Some(item) = state.store.front() {
                return Ok(Some(item.clone()));
            }
            if state.adding_completed {
                return Ok(None);
            }
            let (next, timed_out) = self.wait(&self.inner.not_empty, state, deadline)?;
            state = next;
            if timed_out {
                return Ok(None);
            }
        }
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, QueueState<T>>> {
        lock_or_fail(self.inner.state.lock())
    }

    fn register_wake(&self, token: &CancellationToken) -> Option<CancellationRegistration> {
        let inner = Arc::downgrade(&self.inner);
        token.register(move || {
            if let Some(inner) = inner.upgrade() {
                inner.wake_all();
            }
        })
    }

    /// Wait once on `condvar`; the flag is true when the deadline has passed
    fn wait<'a>(
        &'a self,
        condvar: &Condvar,
        guard: MutexGuard<'a, QueueState<T>>,
        deadline: Option<Instant>,
    ) -> QueueResult<(MutexGuard<'a, QueueState<T>>, bool)> {
        match deadline {
            None => Ok((lock_or_fail(condvar.wait(guard))?, false)),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok((guard, true));
                }
                let (guard, _) = lock_or_fail(condvar.wait_timeout(guard, deadline - now))?;
                Ok((guard, false))
            }
        }
    }

    fn has_space(&self, state: &QueueState<T>) -> bool {
        self.inner
            .capacity
            .map_or(true, |capacity| state.store.len() < capacity)
    }

    fn push(&self, state: &mut QueueState<T>, item: T) {
        state.store.push_back(item);
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        self.inner.not_empty.notify_all();
    }
}

impl<T: Send + 'static> BlockingQueue<T> for BoundedBlockingQueue<T> {
    fn try_add(
        &self,
        item: T,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> QueueResult<AddOutcome<T>> {
        let deadline = deadline_after(timeout);
        let _registration = self.register_wake(token);
        let mut state = self.lock()?;
        loop {
            state.ensure_accepting()?;
            if token.is_cancelled() {
                return Err(QueueError::Cancelled);
            }
            if self.has_space(&state) {
                self.push(&mut state, item);
                return Ok(AddOutcome::Added);
            }
            let (next, timed_out) = self.wait(&self.inner.not_full, state, deadline)?;
            state = next;
            if timed_out {
                return Ok(AddOutcome::TimedOut(item));
            }
        }
    }

    fn add_forced(&self, item: T) -> QueueResult<()> {
        let mut state = self.lock()?;
        state.ensure_accepting()?;
        self.push(&mut state, item);
        Ok(())
    }

    fn try_take(
        &self,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> QueueResult<Option<T>> {
        let deadline = deadline_after(timeout);
        let _registration = self.register_wake(token);
        let mut state = self.lock()?;
        loop {
            if state.disposed {
                return Err(QueueError::Disposed);
            }
            if token.is_cancelled() {
                return Err(QueueError::Cancelled);
            }
            if let Some(item) = state.store.pop_front() {
                self.inner.count.fetch_sub(1, Ordering::AcqRel);
                self.inner.not_full.notify_all();
                return Ok(Some(item));
            }
            if state.adding_completed {
                return Ok(None);
            }
            let (next, timed_out) = self.wait(&self.inner.not_empty, state, deadline)?;
            state = next;
            if timed_out {
                return Ok(None);
            }
        }
    }

    fn complete_adding(&self) -> QueueResult<()> {
        let mut state = self.lock()?;
        if state.disposed {
            return Err(QueueError::Disposed);
        }
        if !state.adding_completed {
            state.adding_completed = true;
            self.inner.adding_completed.store(true, Ordering::Release);
            self.inner.not_empty.notify_all();
            self.inner.not_full.notify_all();
        }
        Ok(())
    }

    fn dispose(&self) {
        let abandoned = {
            let mut state = match self.inner.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if state.disposed {
                return;
            }
            state.disposed = true;
            self.inner.disposed.store(true, Ordering::Release);
            self.inner.count.store(0, Ordering::Release);
            let replacement = self.inner.kind.create(Some(0));
            let abandoned = std::mem::replace(&mut state.store, replacement);
            self.inner.not_empty.notify_all();
            self.inner.not_full.notify_all();
            abandoned
        };
        // Item destructors run outside the lock
        if !abandoned.is_empty() {
            log::debug!("Queue disposed with {} undelivered items", abandoned.len());
        }
    }

    fn len(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    fn capacity(&self) -> Option<usize> {
        self.inner.capacity
    }

    fn is_adding_completed(&self) -> bool {
        self.inner.adding_completed.load(Ordering::Acquire)
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl<T> fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBlockingQueue")
            .field("capacity", &self.inner.capacity)
            .field("kind", &self.inner.kind)
            .field("len", &self.inner.count.load(Ordering::Relaxed))
            .field(
                "adding_completed",
                &self.inner.adding_completed.load(Ordering::Relaxed),
            )
            .field("disposed", &self.inner.disposed.load(Ordering::Relaxed))
            .finish()
    }
}

/// `None` waits forever; a timeout too large to represent does too
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}
