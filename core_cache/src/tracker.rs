//! Outstanding-request tracker: a fixed-capacity CAM keyed by request id.
//!
//! One slot per miss that has been forwarded downstream and not yet answered.
//! The requester contract forbids reusing an id while its entry is live, so
//! `id` is unique among valid slots.

use crate::common::{ReqId, Word};

#[derive(Clone, Copy)]
struct CamSlot {
    valid: bool,
    id: ReqId,
    address: Word,
}

pub struct RequestTracker {
    slots: Vec<CamSlot>,
}

impl RequestTracker {
    pub fn new(cam_ways: usize) -> Self {
        Self {
            slots: vec![
                CamSlot {
                    valid: false,
                    id: ReqId::new(0),
                    address: Word::default(),
                };
                cam_ways
            ],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn outstanding(&self) -> usize {
        self.slots.iter().filter(|s| s.valid).count()
    }

    /// Free-slot check against the current (same-tick) state: a slot freed by
    /// `resolve` earlier in the tick is already counted.
    pub fn has_capacity(&self) -> bool {
        self.slots.iter().any(|s| !s.valid)
    }

    /// Allocates a slot for a forwarded miss. Returns false with no state
    /// change when every slot is live.
    pub fn reserve(&mut self, id: ReqId, address: Word) -> bool {
        debug_assert!(
            !self.slots.iter().any(|s| s.valid && s.id == id),
            "id {id} reserved while still outstanding"
        );
        match self.slots.iter_mut().find(|s| !s.valid) {
            Some(slot) => {
                *slot = CamSlot {
                    valid: true,
                    id,
                    address,
                };
                true
            }
            None => false,
        }
    }

    /// Frees the slot matching `id` and returns its address, or `None` when
    /// no entry matches (a collaborator contract breach, judged by the
    /// caller).
    pub fn resolve(&mut self, id: ReqId) -> Option<Word> {
        let slot = self.slots.iter_mut().find(|s| s.valid && s.id == id)?;
        slot.valid = false;
        Some(slot.address)
    }
}
