//! Point-in-time processor statistics

use crate::processor::ProcessorState;
use crate::queue::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot returned by [`QueueProcessor::stats`](crate::processor::QueueProcessor::stats)
///
/// Counters are read without a common lock, so a snapshot taken while
/// workers run may be off by an in-flight item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub name: String,
    pub state: ProcessorState,
    /// Items whose handler returned `Ok`
    pub processed: u64,
    /// Items whose handler returned `Err` or panicked
    pub faulted: u64,
    pub thread_count: usize,
    pub active_threads: usize,
    pub queued: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl ProcessorStats {
    /// Time spent running, up to now if still running
    pub fn uptime(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let until = self.stopped_at.unwrap_or_else(Utc::now);
        Some(until - started)
    }

    pub fn to_json(&self) -> QueueResult<String> {
        serde_json::to_string(self).map_err(|e| QueueError::OperationFailed {
            message: format!("serialising statistics: {}", e),
        })
    }
}
