//! Public API for worker thread management

// Thread set and its controls
pub use crate::worker::set::{item_handler, ItemHandler, StopOptions, WorkerSettings, WorkerThreadSet};

// Handler faults
pub use crate::worker::fault::{FaultCallback, FaultKind, HandlerError, HandlerFault};

// Thread creation
pub use crate::worker::thread_factory::{
    StdThreadFactory, ThreadBody, ThreadFactory, ThreadPriority, ThreadSpec,
};
