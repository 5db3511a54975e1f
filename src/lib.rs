//! Bounded blocking work queue driven by a managed pool of worker threads
//!
//! - [`queue`]: the thread-safe FIFO with timeouts, cancellation, complete
//!   adding and dispose
//! - [`worker`]: the fixed set of OS threads that drain a queue
//! - [`processor`]: the façade tying both to a lifecycle state machine
//! - [`core`]: cancellation tokens, lock-poison handling, error logging and
//!   optional logger setup

pub mod core;
pub mod processor;
pub mod queue;
pub mod worker;
