//! Bounded Blocking Queue Component
//!
//! A thread-safe FIFO work queue with an optional capacity bound, used as the
//! hand-off point between producers and the worker threads of a
//! [`QueueProcessor`](crate::processor::QueueProcessor).
//!
//! # Overview
//!
//! - **Blocking with deadlines**: add, take and peek wait for space or items,
//!   with an optional timeout and a [`CancellationToken`](crate::core::cancellation::CancellationToken)
//! - **Forced add**: bypasses the capacity bound without blocking
//! - **Complete adding**: one-way end-of-stream; takers drain what is left and
//!   then receive `None` immediately
//! - **Dispose**: releases every blocked caller with [`QueueError::Disposed`]
//! - **Pluggable storage**: ring buffer or linked list, chosen by [`StoreKind`]
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  try_add   ┌───────────────────────────────┐  try_take  ┌──────────┐
//! │ Producer A │──────────▶ │     BoundedBlockingQueue      │ ─────────▶ │ Worker 0 │
//! └────────────┘            │  Mutex<store, flags>          │            └──────────┘
//! ┌────────────┐  try_add   │  Condvar not_full / not_empty │  try_take  ┌──────────┐
//! │ Producer B │──────────▶ │  ┌───┬───┬───┬───┬───┐        │ ─────────▶ │ Worker 1 │
//! └────────────┘            │  │ 1 │ 2 │ 3 │ 4 │...│        │            └──────────┘
//!                           │  └───┴───┴───┴───┴───┘        │
//!                           └───────────────────────────────┘
//! ```
//!
//! Each item is delivered to exactly one taker, in insertion order.

pub mod api;
mod bounded;
mod error;
mod store;
mod traits;

pub use bounded::BoundedBlockingQueue;
pub use error::{QueueError, QueueResult};
pub use store::{ItemStore, StoreKind};
pub use traits::{AddOutcome, BlockingQueue};

#[cfg(test)]
mod tests;
