use std::fmt;

use bitmask_enum::bitmask;

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// to unify displaying of address/data words
pub struct Word(u32);

impl Word {
    pub fn new(v: u32) -> Self {
        Self(v)
    }
    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReqId(u32);

impl ReqId {
    pub fn new(v: u32) -> Self {
        Self(v)
    }
    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// One slot of the fully-associative store or of the tracker, addressed by
/// index rather than by reference.
pub type WayIndex = usize;

/// Upstream request payload. `invalidate` is honored only when the channel is
/// configured with the read-with-invalidate capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
    pub id: ReqId,
    pub address: Word,
    pub invalidate: bool,
}

impl Request {
    pub fn new(id: ReqId, address: Word) -> Self {
        Self {
            id,
            address,
            invalidate: false,
        }
    }
    pub fn with_invalidate(id: ReqId, address: Word) -> Self {
        Self {
            id,
            address,
            invalidate: true,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req {} {}", self.id, self.address)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub id: ReqId,
    pub data: Word,
}

impl Response {
    pub fn new(id: ReqId, data: Word) -> Self {
        Self { id, data }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resp {} {}", self.id, self.data)
    }
}

#[bitmask(u8)]
pub enum PortCap {
    Read,
    Invalidate,
}

impl fmt::Display for PortCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::Read) {
            write!(f, "read")?;
            if self.contains(Self::Invalidate) {
                write!(f, "/invalidate")?;
            }
        } else if self.contains(Self::Invalidate) {
            write!(f, "invalidate")?;
        }
        Ok(())
    }
}
