//! Fully-associative data store: one `{valid, address, data}` entry per way.

use std::fmt;

use crate::common::{Word, WayIndex};

#[derive(Clone, Copy, Default)]
struct WayEntry {
    valid: bool,
    address: Word,
    data: Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub way: WayIndex,
    pub data: Word,
}

/// Post-tick occupancy observability, exported on every step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OccupancyView {
    pub occupancy: usize,
    pub full: bool,
    pub empty: bool,
}

impl fmt::Display for OccupancyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "occupancy {}", self.occupancy)?;
        if self.full {
            write!(f, " (full)")?;
        }
        if self.empty {
            write!(f, " (empty)")?;
        }
        Ok(())
    }
}

pub struct CacheStore {
    ways: Vec<WayEntry>,
}

impl CacheStore {
    pub fn new(way_count: usize) -> Self {
        Self {
            ways: vec![WayEntry::default(); way_count],
        }
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Combinational lookup over all ways. Among valid entries the address is
    /// unique, so at most one way can match.
    pub fn probe(&self, address: Word) -> Option<Hit> {
        let mut found = None;
        for (way, e) in self.ways.iter().enumerate() {
            if e.valid && e.address == address {
                debug_assert!(found.is_none(), "duplicate tag for {address}");
                found = Some(Hit { way, data: e.data });
            }
        }
        found
    }

    /// Writes `way` unconditionally. Overwriting a valid entry is intentional
    /// capacity reuse (the resident entry is evicted).
    pub fn fill(&mut self, way: WayIndex, address: Word, data: Word) {
        self.ways[way] = WayEntry {
            valid: true,
            address,
            data,
        };
    }

    /// Returns whether the way held a valid entry.
    pub fn invalidate(&mut self, way: WayIndex) -> bool {
        let was_valid = self.ways[way].valid;
        self.ways[way].valid = false;
        was_valid
    }

    pub fn is_valid(&self, way: WayIndex) -> bool {
        self.ways[way].valid
    }

    pub fn find_invalid(&self) -> Option<WayIndex> {
        self.ways.iter().position(|e| !e.valid)
    }

    pub fn occupancy(&self) -> usize {
        self.ways.iter().filter(|e| e.valid).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() == self.ways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    pub fn view(&self) -> OccupancyView {
        let occupancy = self.occupancy();
        OccupancyView {
            occupancy,
            full: occupancy == self.ways.len(),
            empty: occupancy == 0,
        }
    }
}
