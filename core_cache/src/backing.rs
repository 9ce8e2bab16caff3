//! Downstream collaborator models.
//!
//! The backing store is specified only at its interface: it accepts forwarded
//! misses when `ready`, and eventually produces exactly one response per
//! accepted request. `DelayedMemory` is the usual fixed-latency model; the
//! null model errors on any traffic, for traces that must stay resident.

use std::collections::{HashMap, VecDeque};

use anyhow::{anyhow, Result};

use crate::common::{Request, Response, Word};

pub trait Backing {
    /// can accept a forwarded miss this tick
    fn ready(&self) -> bool;
    fn accept(&mut self, req: Request) -> Result<()>;
    /// advance one tick
    fn step(&mut self);
    /// next completed response, in completion order. Called only when the
    /// response handshake has room; completions queue up meanwhile.
    fn pop_response(&mut self) -> Option<Response>;
}

pub struct NullBacking {}

impl NullBacking {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NullBacking {
    fn default() -> Self {
        Self::new()
    }
}

impl Backing for NullBacking {
    fn ready(&self) -> bool {
        false
    }
    fn accept(&mut self, req: Request) -> Result<()> {
        Err(anyhow!("miss {req} forwarded to the null backing store"))
    }
    fn step(&mut self) {}
    fn pop_response(&mut self) -> Option<Response> {
        None
    }
}

/// Word-addressed memory answering every request after a fixed latency.
/// Unwritten words read as zero.
pub struct DelayedMemory {
    latency: usize,
    now: usize,
    words: HashMap<Word, Word>,
    inflight: VecDeque<(usize, Request)>,
    done: VecDeque<Response>,
}

impl DelayedMemory {
    pub fn new(latency: usize) -> Self {
        Self {
            latency,
            now: 0,
            words: HashMap::new(),
            inflight: VecDeque::new(),
            done: VecDeque::new(),
        }
    }

    pub fn preload(&mut self, address: Word, data: Word) {
        self.words.insert(address, data);
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len() + self.done.len()
    }
}

impl Backing for DelayedMemory {
    fn ready(&self) -> bool {
        true
    }

    fn accept(&mut self, req: Request) -> Result<()> {
        self.inflight.push_back((self.now + self.latency, req));
        Ok(())
    }

    fn step(&mut self) {
        self.now += 1;
        while let Some(&(due, req)) = self.inflight.front() {
            if due > self.now {
                break;
            }
            self.inflight.pop_front();
            let data = self.words.get(&req.address).copied().unwrap_or_default();
            self.done.push_back(Response::new(req.id, data));
        }
    }

    fn pop_response(&mut self) -> Option<Response> {
        self.done.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ReqId;

    #[test]
    fn answers_after_latency_in_order() {
        let mut m = DelayedMemory::new(2);
        m.preload(Word::new(0x10), Word::new(0xAA));
        m.accept(Request::new(ReqId::new(1), Word::new(0x10))).unwrap();
        m.step();
        m.accept(Request::new(ReqId::new(2), Word::new(0x44))).unwrap();
        assert!(m.pop_response().is_none());
        m.step();
        assert_eq!(
            m.pop_response(),
            Some(Response::new(ReqId::new(1), Word::new(0xAA)))
        );
        m.step();
        // unwritten word reads as zero
        assert_eq!(
            m.pop_response(),
            Some(Response::new(ReqId::new(2), Word::new(0)))
        );
        assert_eq!(m.in_flight(), 0);
    }

    #[test]
    fn completions_queue_while_unread() {
        let mut m = DelayedMemory::new(1);
        m.accept(Request::new(ReqId::new(1), Word::new(0x10))).unwrap();
        m.step();
        m.accept(Request::new(ReqId::new(2), Word::new(0x14))).unwrap();
        m.step();
        m.step();
        assert_eq!(m.in_flight(), 2);
        assert_eq!(m.pop_response().unwrap().id, ReqId::new(1));
        assert_eq!(m.pop_response().unwrap().id, ReqId::new(2));
    }
}
