//! Public API for queue processors
//!
//! Brings in everything needed to configure, run and stop a processor.

pub use crate::processor::config::ProcessorConfig;
pub use crate::processor::processor::{QueueProcessor, QueueProcessorBuilder};
pub use crate::processor::state::ProcessorState;
pub use crate::processor::stats::ProcessorStats;

// Collaborators that appear in processor signatures
pub use crate::core::cancellation::CancellationToken;
pub use crate::queue::api::{AddOutcome, BlockingQueue, QueueError, QueueResult, StoreKind};
pub use crate::worker::api::{
    FaultKind, HandlerError, HandlerFault, StopOptions, ThreadFactory, ThreadPriority,
};
