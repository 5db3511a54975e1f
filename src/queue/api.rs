//! Public API for the queue system
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Queue implementations and the abstraction they share
pub use crate::queue::bounded::BoundedBlockingQueue;
pub use crate::queue::traits::{AddOutcome, BlockingQueue};

// Storage selection
pub use crate::queue::store::{ItemStore, StoreKind};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

// Cancellation is part of every blocking signature
pub use crate::core::cancellation::CancellationToken;
