//! # Counters — Live-Bit Counter Tree
//!
//! A 0-indexed Fenwick tree over the bits of one [`BitSieve`] segment.
//! `query(i)` returns the number of live (set) bits in `[0, i]` and
//! `update(i)` records that bit `i` went from live to dead.
//!
//! Index arithmetic uses the `i | (i + 1)` / `(i & (i + 1)) - 1` form of the
//! tree, so no padding slot is needed and `init` runs in O(n).
//!
//! The tree is rebuilt by [`CounterTree::init`] at every segment boundary;
//! nothing carries over between segments.

use crate::sieve::BitSieve;

#[derive(Debug, Clone, Default)]
pub struct CounterTree {
    tree: Vec<u32>,
}

impl CounterTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the current live bits of `sieve`. Reuses the allocation.
    pub fn init(&mut self, sieve: &BitSieve) {
        let n = sieve.len();
        self.tree.clear();
        self.tree.resize(n, 0);

        for i in 0..n {
            self.tree[i] += sieve.test(i) as u32;
            let parent = i | (i + 1);
            if parent < n {
                let value = self.tree[i];
                self.tree[parent] += value;
            }
        }
    }

    /// Number of live bits in `[0, pos]`.
    #[inline]
    pub fn query(&self, pos: usize) -> u64 {
        debug_assert!(pos < self.tree.len());
        let mut sum = 0u64;
        let mut i = pos as isize;
        while i >= 0 {
            sum += self.tree[i as usize] as u64;
            i = (i & (i + 1)) - 1;
        }
        sum
    }

    /// Record the live→dead transition of bit `pos`. Must be called exactly
    /// once per transition.
    #[inline]
    pub fn update(&mut self, pos: usize) {
        let n = self.tree.len();
        let mut i = pos;
        while i < n {
            debug_assert!(self.tree[i] > 0, "counter underflow at {}", i);
            self.tree[i] -= 1;
            i |= i + 1;
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
