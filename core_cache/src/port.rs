//! Producer side of a valid/ready handshake.
//!
//! A pending payload stays offered, unchanged, until the consumer takes it;
//! backpressure is re-offering, never dropping.

pub struct Handshake<T> {
    pending: Option<T>,
}

impl<T> Default for Handshake<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Handshake<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts offering `payload`. While an offer is already in flight the
    /// payload is handed back; the in-flight offer must not change.
    pub fn offer(&mut self, payload: T) -> Option<T> {
        if self.pending.is_some() {
            return Some(payload);
        }
        self.pending = Some(payload);
        None
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Consumer accepted the offer this tick.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }
}
