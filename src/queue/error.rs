//! Queue Error Types
//!
//! Timeouts are never errors: blocking calls report them as
//! [`AddOutcome::TimedOut`](crate::queue::AddOutcome) or `Ok(None)`.

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The caller's cancellation token fired while the call was waiting
    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Adding has been completed; no new items are accepted")]
    AddingCompleted,

    #[error("Queue has been disposed")]
    Disposed,

    #[error("Worker threads have already been started")]
    AlreadyStarted,

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to spawn worker thread '{name}': {message}")]
    ThreadSpawn { name: String, message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl QueueError {
    /// True for the two faults that mean "this queue no longer accepts items"
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::AddingCompleted | QueueError::Disposed)
    }
}

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            QueueError::AddingCompleted
                | QueueError::Disposed
                | QueueError::AlreadyStarted
                | QueueError::InvalidConfig { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::AddingCompleted => Some("adding has been completed"),
            QueueError::Disposed => Some("processor has been disposed"),
            QueueError::AlreadyStarted => Some("processor has already been started"),
            QueueError::InvalidConfig { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
