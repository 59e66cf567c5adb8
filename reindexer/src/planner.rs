//! Slice planning
//!
//! A reindex is split into `shards × multiplier` slices so the engine can
//! parallelise across shards and a failed unit only redoes a fraction of the
//! work.

use crate::task::ReindexingSlice;

/// Number of slices for a source index with `shards` primary shards
pub fn slice_count(shards: u32, multiplier: u32) -> u32 {
    shards.max(1).saturating_mul(multiplier.max(1))
}

/// Pending slices `0..count` for one subtask
pub fn plan_slices(shards: u32, multiplier: u32) -> Vec<ReindexingSlice> {
    let count = slice_count(shards, multiplier);
    (0..count).map(|i| ReindexingSlice::new(i, count)).collect()
}
