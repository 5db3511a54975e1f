//! Synchronization utilities for robust lock handling
//!
//! Every lock and condition-variable wait in the crate funnels its poison
//! result through these helpers so a panic on another thread surfaces as a
//! [`QueueError::OperationFailed`] rather than a cascade of panics.

use crate::queue::{QueueError, QueueResult};
use std::sync::{LockResult, RwLockReadGuard, RwLockWriteGuard};

/// Handle poisoned mutex cases with consistent error handling
///
/// Converts the poison error of a `lock()` or `Condvar::wait*` result into an
/// application error built by `error_constructor`.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use queue_processor::core::sync::handle_mutex_poison;
/// use queue_processor::queue::QueueError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(
///     mutex.lock(),
///     |message| QueueError::OperationFailed { message }
/// ).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock read operations with consistent error handling
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). This indicates a panic occurred while holding a write lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Handle poisoned RwLock write operations with consistent error handling
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). This indicates a panic occurred while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Shorthand used throughout the crate: poison becomes `OperationFailed`
pub(crate) fn lock_or_fail<T>(result: LockResult<T>) -> QueueResult<T> {
    handle_mutex_poison(result, |message| QueueError::OperationFailed { message })
}
