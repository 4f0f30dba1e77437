//! FIFO queue of connections awaiting a partner.
//!
//! Strict arrival order with no duplicates: the earliest `start_chat` is
//! paired first, with no priority or randomization. Disjointness from the
//! paired set is the coordinator's job; this type only guarantees order and
//! uniqueness.

use std::collections::VecDeque;

use crate::protocol::ConnectionId;

/// Ordered set of connections waiting to be matched.
#[derive(Debug, Default)]
pub struct WaitQueue {
    waiting: VecDeque<ConnectionId>,
}

impl WaitQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already queued.
    ///
    /// Returns `true` if the connection was added.
    pub fn enqueue(&mut self, id: ConnectionId) -> bool {
        if self.waiting.contains(&id) {
            return false;
        }
        self.waiting.push_back(id);
        true
    }

    /// Pop the longest-waiting connection, if any.
    pub fn pop(&mut self) -> Option<ConnectionId> {
        self.waiting.pop_front()
    }

    /// Remove `id` from wherever it sits in the queue.
    ///
    /// Returns `true` if the connection was queued.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        match self.waiting.iter().position(|waiting| *waiting == id) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is currently queued.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.waiting.contains(&id)
    }

    /// Number of queued connections.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
