//! Test modules for the blocking queue
//!
//! Tests are organized by functional area for better maintainability.

mod concurrent;
mod edge_cases;
