//! Generic error handling utilities
//!
//! Provides unified error logging that can work across different error types
//! while keeping caller-facing faults distinct from internal failures.

/// Trait for errors that can distinguish between caller-actionable and system errors
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`; when it returns `false`, `user_message()` should return
/// `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error describes a misuse the caller can correct,
    /// such as adding to a completed queue or an invalid configuration value
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific message if this is a caller-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// Caller-actionable errors are logged with their own message; system errors
/// are logged with the operation context and the detail goes to debug level.
///
/// # Examples
/// ```rust,no_run
/// # use queue_processor::core::error_handling::log_error_with_context;
/// # use queue_processor::queue::QueueError;
/// let err = QueueError::OperationFailed { message: "mutex poisoned".to_string() };
/// log_error_with_context(&err, "Starting worker threads");
/// // Logs: "Starting worker threads failed"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("{}: {}", operation_context, user_msg);
        }
        _ => {
            log::error!("{} failed", operation_context);
        }
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
