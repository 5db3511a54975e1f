//! Ordered backing stores for the blocking queue
//!
//! The queue's locking and wait logic is independent of how items are kept in
//! order. [`StoreKind`] selects the representation at construction time.

use serde::{Deserialize, Serialize};
use std::collections::{LinkedList, VecDeque};

/// Largest number of slots pre-allocated for an array store
const MAX_PREALLOCATED_SLOTS: usize = 64 * 1024;

/// FIFO storage used under the queue's lock
pub trait ItemStore<T>: Send {
    fn push_back(&mut self, item: T);
    fn pop_front(&mut self) -> Option<T>;
    fn front(&self) -> Option<&T>;
    fn len(&self) -> usize;
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send> ItemStore<T> for VecDeque<T> {
    fn push_back(&mut self, item: T) {
        VecDeque::push_back(self, item)
    }

    fn pop_front(&mut self) -> Option<T> {
        VecDeque::pop_front(self)
    }

    fn front(&self) -> Option<&T> {
        VecDeque::front(self)
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn clear(&mut self) {
        VecDeque::clear(self)
    }
}

impl<T: Send> ItemStore<T> for LinkedList<T> {
    fn push_back(&mut self, item: T) {
        LinkedList::push_back(self, item)
    }

    fn pop_front(&mut self) -> Option<T> {
        LinkedList::pop_front(self)
    }

    fn front(&self) -> Option<&T> {
        LinkedList::front(self)
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn clear(&mut self) {
        LinkedList::clear(self)
    }
}

/// Representation of the queue's ordered store
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreKind {
    /// Ring buffer; pre-allocates up to the capacity bound
    #[default]
    Array,
    /// Linked list; allocates per item, never reallocates
    Linked,
}

impl StoreKind {
    pub fn create<T: Send + 'static>(self, capacity: Option<usize>) -> Box<dyn ItemStore<T>> {
        match self {
            StoreKind::Array => {
                let slots = capacity.unwrap_or(0).min(MAX_PREALLOCATED_SLOTS);
                Box::new(VecDeque::with_capacity(slots))
            }
            StoreKind::Linked => Box::new(LinkedList::new()),
        }
    }
}
