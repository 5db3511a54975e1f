//! Queue Processor
//!
//! The façade most callers use: a [`QueueProcessor`] owns a bounded queue and a
//! fixed pool of worker threads, and exposes producer operations, stop and
//! dispose, and a lifecycle [`ProcessorState`].
//!
//! ```rust
//! use queue_processor::processor::{ProcessorConfig, ProcessorState, QueueProcessor};
//! use queue_processor::worker::StopOptions;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let total = Arc::new(AtomicUsize::new(0));
//! let sum = Arc::clone(&total);
//! let processor = QueueProcessor::new(
//!     ProcessorConfig::new("sum").with_thread_count(2).with_capacity(16),
//!     move |n: usize, _token| {
//!         sum.fetch_add(n, Ordering::Relaxed);
//!         Ok(())
//!     },
//! )
//! .unwrap();
//!
//! processor.start().unwrap();
//! for n in 1..=10 {
//!     processor.add(n).unwrap();
//! }
//! processor.stop(StopOptions::graceful()).unwrap();
//!
//! assert_eq!(processor.state(), ProcessorState::Stopped);
//! assert_eq!(total.load(Ordering::Relaxed), 55);
//! ```

pub mod api;
mod config;
#[allow(clippy::module_inception)]
mod processor;
mod state;
mod stats;

pub use config::ProcessorConfig;
pub use processor::{QueueProcessor, QueueProcessorBuilder};
pub use state::ProcessorState;
pub use stats::ProcessorStats;

#[cfg(test)]
mod tests;
