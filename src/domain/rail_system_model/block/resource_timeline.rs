use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use crate::domain::rail_system_model::block::block::{Block, BlockId};
use crate::domain::rail_system_model::utils::time::{Minutes, TimeInterval};

/// Interval index of all blocks occupying one resource.
///
/// Blocks are kept ordered by `(start, id)`. Together with the longest duration ever stored this
/// bounds an overlap query to the key range `(query.start - max_duration, query.end)`, so a query
/// costs `O(log n + k)`.
#[derive(Debug, Clone, Default)]
pub struct ResourceTimeline {
    blocks: BTreeMap<(Minutes, BlockId), Block>,

    /// Upper bound on the duration of any stored block. Only grows, which keeps it a valid bound.
    max_duration: Minutes,
}

impl ResourceTimeline {
    pub fn new() -> Self {
        Self { blocks: BTreeMap::new(), max_duration: 0 }
    }

    pub fn insert(&mut self, block: Block) {
        self.max_duration = self.max_duration.max(block.duration());
        self.blocks.insert((block.start(), block.id), block);
    }

    /// Removes the block with the given id and start time.
    pub fn remove(&mut self, id: BlockId, start: Minutes) -> Option<Block> {
        let removed = self.blocks.remove(&(start, id));

        if removed.is_none() {
            // The caller tracks the start of every stored block, so a miss signals an index defect.
            log::error!("Block {} was expected at start {} on this timeline but was not found.", id, start);
        }

        if self.blocks.is_empty() {
            self.max_duration = 0;
        }

        removed
    }

    pub fn get(&self, id: BlockId, start: Minutes) -> Option<&Block> {
        self.blocks.get(&(start, id))
    }

    pub fn get_mut(&mut self, id: BlockId, start: Minutes) -> Option<&mut Block> {
        self.blocks.get_mut(&(start, id))
    }

    /// All blocks whose interval intersects `interval`, ordered by `(start, id)`.
    pub fn overlapping<'a>(&'a self, interval: &TimeInterval) -> impl Iterator<Item = &'a Block> + use<'a> {
        let lower = interval.start.saturating_sub(self.max_duration);
        // Keeps the range well formed for degenerate queries; the filter rejects them anyway.
        let upper = interval.end.max(lower.saturating_add(1));
        let query = *interval;

        self.blocks
            .range((Excluded((lower, BlockId(u64::MAX))), Excluded((upper, BlockId(0)))))
            .map(|(_, block)| block)
            .filter(move |block| !query.is_degenerate() && block.interval.intersects(&query))
    }

    /// Like `overlapping`, but the query is widened by a safety buffer on both sides.
    pub fn within_buffer<'a>(&'a self, interval: &TimeInterval, buffer: Minutes) -> impl Iterator<Item = &'a Block> + use<'a> {
        let widened = TimeInterval::new(interval.start.saturating_sub(buffer), interval.end.saturating_add(buffer));
        let query = *interval;

        self.overlapping(&widened).filter(move |block| block.interval.intersects_with_buffer(&query, buffer))
    }

    /// The last block starting strictly before `time`.
    pub fn preceding(&self, time: Minutes) -> Option<&Block> {
        self.blocks.range((Unbounded, Excluded((time, BlockId(0))))).next_back().map(|(_, block)| block)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
