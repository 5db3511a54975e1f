//! Cooperative cancellation for blocking waits
//!
//! A [`CancellationToken`] is a one-way flag shared between the party that
//! requests cancellation and every thread observing it. Blocking operations
//! register a wake callback for the duration of a wait, so cancelling a token
//! interrupts the wait even when the condition being waited on never becomes
//! true.
//!
//! Callbacks run on the cancelling thread, after the token's own lock has been
//! released, and only once. A callback registered after cancellation is never
//! invoked: waiters must re-check [`CancellationToken::is_cancelled`] after
//! registering.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type WakeCallback = Box<dyn Fn() + Send + Sync>;

struct TokenInner {
    cancelled: AtomicBool,
    next_registration: AtomicU64,
    callbacks: Mutex<HashMap<u64, WakeCallback>>,
}

/// Cloneable, one-way cancellation signal
///
/// Clones share the same underlying flag. [`CancellationToken::none`] returns
/// a token that can never be cancelled and costs nothing to observe.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Option<Arc<TokenInner>>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                next_registration: AtomicU64::new(0),
                callbacks: Mutex::new(HashMap::new()),
            })),
        }
    }

    /// A token that is never cancelled
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// Whether this token is able to fire at all
    pub fn can_be_cancelled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.cancelled.load(Ordering::Acquire))
    }

    /// Request cancellation and wake every registered waiter
    ///
    /// Idempotent; only the first call runs callbacks.
    pub fn cancel(&self) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        if inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        // Callbacks take other locks; never run them under ours
        let callbacks: Vec<WakeCallback> = match inner.callbacks.lock() {
            Ok(mut map) => map.drain().map(|(_, cb)| cb).collect(),
            Err(poisoned) => poisoned.into_inner().drain().map(|(_, cb)| cb).collect(),
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Register a callback to run when the token is cancelled
    ///
    /// Returns `None` for a token that can never fire. The callback is
    /// unregistered when the returned guard is dropped.
    pub fn register<F>(&self, callback: F) -> Option<CancellationRegistration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = self.inner.as_ref()?;
        let id = inner.next_registration.fetch_add(1, Ordering::Relaxed);
        match inner.callbacks.lock() {
            Ok(mut map) => map.insert(id, Box::new(callback)),
            Err(poisoned) => poisoned.into_inner().insert(id, Box::new(callback)),
        };
        Some(CancellationRegistration {
            token: Arc::downgrade(inner),
            id,
        })
    }

    #[cfg(test)]
    pub(crate) fn registered_callbacks(&self) -> usize {
        self.inner
            .as_ref()
            .map(|inner| inner.callbacks.lock().map(|m| m.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("can_be_cancelled", &self.can_be_cancelled())
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Guard that removes a wake callback from its token on drop
pub struct CancellationRegistration {
    token: Weak<TokenInner>,
    id: u64,
}

impl Drop for CancellationRegistration {
    fn drop(&mut self) {
        if let Some(inner) = self.token.upgrade() {
            match inner.callbacks.lock() {
                Ok(mut map) => map.remove(&self.id),
                Err(poisoned) => poisoned.into_inner().remove(&self.id),
            };
        }
    }
}
