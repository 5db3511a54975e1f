//! Worker Thread Management
//!
//! A [`WorkerThreadSet`] owns a fixed number of OS threads that pull items from
//! a shared [`BlockingQueue`](crate::queue::BlockingQueue) and run a handler on
//! each one.
//!
//! # Worker loop
//!
//! ```text
//!        ┌──────────────────────────────┐
//!        ▼                              │
//!   ┌─────────┐  item   ┌──────────┐    │
//!   │  idle   │───────▶ │  active  │────┘ handler returned / faulted
//!   │ (take)  │         │(handler) │
//!   └─────────┘         └──────────┘
//!        │ drained / cancelled / disposed
//!        ▼
//!      exit ──▶ last one out runs the exit hook
//! ```
//!
//! Handler errors and panics are contained per item; see [`HandlerFault`].

pub mod api;
mod fault;
mod set;
mod thread_factory;

pub use fault::{FaultCallback, FaultKind, HandlerError, HandlerFault};
pub use set::{item_handler, ItemHandler, StopOptions, WorkerSettings, WorkerThreadSet};
pub use thread_factory::{
    apply_priority, StdThreadFactory, ThreadBody, ThreadFactory, ThreadPriority, ThreadSpec,
};

#[cfg(test)]
mod tests;
