//! Bounded FIFO of completed responses awaiting upstream delivery.
//!
//! Entries are queued in completion order, not request order: a hit can
//! complete ahead of an earlier miss still waiting on the backing store.

use std::collections::VecDeque;

use crate::common::Response;

pub struct ResponseBuffer {
    depth: usize,
    queue: VecDeque<Response>,
}

impl ResponseBuffer {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            queue: VecDeque::with_capacity(depth),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() == self.depth
    }

    /// Fails (no state change) when the buffer is full.
    pub fn push(&mut self, resp: Response) -> bool {
        if self.is_full() {
            return false;
        }
        self.queue.push_back(resp);
        true
    }

    pub fn pop(&mut self) -> Option<Response> {
        self.queue.pop_front()
    }
}
