//! Pseudo-LRU replacement over a power-of-two number of ways.
//!
//! The recency state is a binary tree of direction bits kept in a flat
//! vector in heap order (node `i` has children `2i+1`, `2i+2`). A bit of
//! `false` means the less-recently-used subtree is on the left. Touching a
//! way flips every bit on its root path away from it; victim selection
//! follows the bits down to a leaf.

use crate::common::WayIndex;

pub struct PlruTree {
    bits: Vec<bool>,
    ways: usize,
}

impl PlruTree {
    /// `ways` must be a nonzero power of two (checked by `CacheConfig`).
    pub fn new(ways: usize) -> Self {
        debug_assert!(ways.is_power_of_two());
        Self {
            bits: vec![false; ways - 1],
            ways,
        }
    }

    fn leaf(&self, way: WayIndex) -> usize {
        way + self.ways - 1
    }

    /// Marks `way` most recently used: every ancestor bit points to the
    /// sibling subtree.
    pub fn touch(&mut self, way: WayIndex) {
        let mut node = self.leaf(way);
        while node > 0 {
            let parent = (node - 1) / 2;
            let came_from_right = node == 2 * parent + 2;
            self.bits[parent] = !came_from_right;
            node = parent;
        }
    }

    /// Marks `way` least recently used, so a just-invalidated way is the next
    /// nomination even before any invalid-way scan.
    pub fn forget(&mut self, way: WayIndex) {
        let mut node = self.leaf(way);
        while node > 0 {
            let parent = (node - 1) / 2;
            let came_from_right = node == 2 * parent + 2;
            self.bits[parent] = came_from_right;
            node = parent;
        }
    }

    /// Walks the direction bits to the pseudo-least-recently-used way.
    pub fn victim(&self) -> WayIndex {
        let mut node = 0;
        while node < self.ways - 1 {
            node = if self.bits[node] {
                2 * node + 2
            } else {
                2 * node + 1
            };
        }
        node - (self.ways - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_tree_nominates_way_zero() {
        assert_eq!(PlruTree::new(4).victim(), 0);
        assert_eq!(PlruTree::new(1).victim(), 0);
    }

    #[test]
    fn touched_way_is_protected() {
        let mut t = PlruTree::new(4);
        for way in 0..4 {
            t.touch(way);
            assert_ne!(t.victim(), way);
        }
    }

    #[test]
    fn round_robin_touches_cycle_victims() {
        let mut t = PlruTree::new(4);
        // touching 0..3 in order leaves 0 as the least recent
        for way in 0..4 {
            t.touch(way);
        }
        assert_eq!(t.victim(), 0);
    }

    #[test]
    fn forget_makes_way_the_victim() {
        let mut t = PlruTree::new(8);
        for way in 0..8 {
            t.touch(way);
        }
        t.forget(5);
        assert_eq!(t.victim(), 5);
    }
}
