//! Faults raised by item handlers
//!
//! A handler that returns `Err` or panics never takes its worker down. The
//! fault is logged and, when configured, passed to a fault callback; the worker
//! then carries on with the next item.

use std::any::Any;
use std::sync::Arc;

/// Error type item handlers return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives every handler fault, on the worker thread that raised it
pub type FaultCallback = Arc<dyn Fn(&HandlerFault) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum FaultKind {
    #[error("handler returned an error: {0}")]
    Error(#[source] HandlerError),

    #[error("handler panicked: {0}")]
    Panic(String),
}

/// A single failed item, attributed to the worker that ran it
#[derive(Debug, thiserror::Error)]
#[error("worker {worker_index} ({thread_name}): {kind}")]
pub struct HandlerFault {
    pub worker_index: usize,
    pub thread_name: String,
    #[source]
    pub kind: FaultKind,
}

impl HandlerFault {
    pub fn is_panic(&self) -> bool {
        matches!(self.kind, FaultKind::Panic(_))
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
