//! Frontier of pending work units
//!
//! The frontier is a priority queue with duplicate suppression:
//! - Higher priority values are popped first
//! - Units with equal priority are popped in submission order
//! - A unit whose stage and normalized URL were already scheduled is dropped,
//!   unless it carries the dedup bypass (retries)

use crate::crawler::WorkUnit;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// A work unit waiting in the heap, tagged with its submission sequence
#[derive(Debug)]
struct QueuedUnit {
    unit: WorkUnit,
    seq: u64,
}

// Higher priority first; among equals, the lower sequence number wins
impl Ord for QueuedUnit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unit
            .priority
            .cmp(&other.unit.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedUnit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUnit {
    fn eq(&self, other: &Self) -> bool {
        self.unit.priority == other.unit.priority && self.seq == other.seq
    }
}

impl Eq for QueuedUnit {}

/// Priority queue of work units with dedup by stage and normalized URL
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<QueuedUnit>,
    seen: HashSet<String>,
    next_seq: u64,
    duplicates: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits a unit
    ///
    /// # Returns
    ///
    /// * `true` - The unit was queued
    /// * `false` - The unit duplicated an earlier submission and was dropped
    pub fn push(&mut self, unit: WorkUnit) -> bool {
        let key = unit.dedup_key();
        let fresh = self.seen.insert(key);

        if !fresh && !unit.bypass_dedup {
            self.duplicates += 1;
            tracing::trace!("Dropped duplicate {} unit: {}", unit.stage, unit.url);
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedUnit { unit, seq });
        true
    }

    /// Removes and returns the unit with the highest priority
    pub fn pop(&mut self) -> Option<WorkUnit> {
        self.heap.pop().map(|queued| queued.unit)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of submissions dropped as duplicates
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}
