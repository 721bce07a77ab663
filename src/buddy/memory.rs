//! Simulated buddy memory
//!
//! Owns the block table and implements allocation with left-first buddy
//! splitting, release by id or address, and coalescing of free buddies.
//!
//! The table is a `Vec<Block>` sorted by start address that always tiles
//! `[0, capacity)`. Address lookups use binary search; splits and merges
//! shift the tail of the vector, which is linear but fine at simulation scale.

use alloc::vec::Vec;
use core::iter::FusedIterator;
use core::slice;

use crate::{round_up_pow2, Lookup, SimError, SimResult};

#[cfg(feature = "log")]
use log::{debug, info, warn};

use super::{
    block::{Block, BlockId, BlockState},
    fit::{choose, FitStrategy},
    stats::MemoryStats,
};

/// Buddy allocator over a simulated address space
#[derive(Debug, Clone)]
pub struct Memory {
    capacity: usize,
    /// Sorted by `start`, tiles `[0, capacity)`
    blocks: Vec<Block>,
    next_id: u64,
    /// Start of the most recent allocation, the next-fit cursor
    last_alloc_pos: usize,
}

impl Memory {
    /// Create a memory of `capacity` bytes rounded up to a power of two.
    pub fn new(capacity: usize) -> SimResult<Self> {
        if capacity == 0 {
            return Err(SimError::InvalidCapacity);
        }
        let capacity = round_up_pow2(capacity).ok_or(SimError::InvalidCapacity)?;

        info!("buddy memory: initialized with {} bytes", capacity);

        let mut blocks = Vec::new();
        blocks.push(Block::free(0, capacity));
        Ok(Self {
            capacity,
            blocks,
            next_id: 1,
            last_alloc_pos: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of blocks (free and used) in the table
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn last_alloc_pos(&self) -> usize {
        self.last_alloc_pos
    }

    /// Allocate `size` bytes using `strategy` to pick the free block.
    ///
    /// The request is rounded up to a power of two; the chosen block is split
    /// in halves, always continuing with the left half, until it matches.
    pub fn allocate(&mut self, size: usize, strategy: FitStrategy) -> SimResult<BlockId> {
        if size == 0 {
            return Err(SimError::InvalidRequest);
        }

        let target = match round_up_pow2(size) {
            Some(target) if target <= self.capacity => target,
            _ => {
                debug!(
                    "buddy memory: request of {} bytes exceeds capacity {}",
                    size, self.capacity
                );
                return Err(SimError::OutOfMemory { requested: size });
            }
        };

        let chosen = choose(&self.blocks, target, strategy, self.last_alloc_pos).ok_or_else(|| {
            debug!(
                "buddy memory: allocation failure: {} bytes (block {}) via {}",
                size, target, strategy
            );
            SimError::OutOfMemory { requested: size }
        })?;

        let idx = self
            .index_of(chosen.start)
            .ok_or(SimError::OutOfMemory { requested: size })?;

        // Split down to the target size, keeping the left half
        while self.blocks[idx].size > target {
            let (left, right) = self.blocks[idx].split();
            debug!(
                "buddy memory: split @{} +{}B into @{} and @{}",
                left.start,
                left.size * 2,
                left.start,
                right.start
            );
            self.blocks[idx] = left;
            self.blocks.insert(idx + 1, right);
        }

        let id = BlockId::new(self.next_id);
        self.next_id += 1;

        let block = &mut self.blocks[idx];
        debug_assert!(crate::is_aligned(block.start, block.size));
        block.state = BlockState::Used {
            id,
            requested_size: size,
        };
        self.last_alloc_pos = block.start;

        debug!(
            "buddy memory: allocated id={} @{} +{}B (requested={}B) via {}",
            id, block.start, block.size, size, strategy
        );
        Ok(id)
    }

    /// Release the used block with the given id.
    ///
    /// Returns the block as it was before release.
    pub fn free_by_id(&mut self, id: BlockId) -> SimResult<Block> {
        let idx = self
            .blocks
            .iter()
            .position(|block| block.id() == Some(id))
            .ok_or_else(|| {
                warn!("buddy memory: free of unknown id {}", id);
                SimError::NotFound(Lookup::Id(id))
            })?;
        Ok(self.release(idx))
    }

    /// Release the block starting at `start`.
    ///
    /// Returns the block as it was before release.
    pub fn free_by_address(&mut self, start: usize) -> SimResult<Block> {
        let idx = self.index_of(start).ok_or_else(|| {
            warn!("buddy memory: no block starts at address {}", start);
            SimError::NotFound(Lookup::Address(start))
        })?;
        if self.blocks[idx].is_free() {
            warn!("buddy memory: double free detected at address {}", start);
            return Err(SimError::AlreadyFree { start });
        }
        Ok(self.release(idx))
    }

    /// Mark the block at `idx` free and coalesce.
    fn release(&mut self, idx: usize) -> Block {
        let freed = self.blocks[idx];
        self.blocks[idx].state = BlockState::Free;
        debug!("buddy memory: released {}", freed);
        self.coalesce(idx);
        freed
    }

    /// Merge free buddy pairs until none remain.
    ///
    /// Only `hint` can have become mergeable, so merging starts there and
    /// follows the merged block upward. Two buddies of equal size are always
    /// neighbours in the sorted table, so only adjacent entries are compared.
    fn coalesce(&mut self, hint: usize) {
        let mut idx = hint;
        loop {
            let block = self.blocks[idx];
            if block.is_used() || block.size == self.capacity {
                return;
            }

            // The buddy is the right neighbour if this is a left half, else the left one
            let (left_idx, buddy_idx) = if block.buddy_start() > block.start {
                (idx, idx + 1)
            } else {
                match idx.checked_sub(1) {
                    Some(prev) => (prev, prev),
                    None => return,
                }
            };
            let Some(buddy) = self.blocks.get(buddy_idx).copied() else {
                return;
            };
            if buddy.is_used() || !block.is_buddy_of(&buddy) {
                return;
            }

            let merged = Block::free(block.start.min(buddy.start), block.size * 2);
            debug!(
                "buddy memory: merged @{} and @{} into @{} +{}B",
                block.start, buddy.start, merged.start, merged.size
            );
            self.blocks[left_idx] = merged;
            self.blocks.remove(left_idx + 1);
            idx = left_idx;
        }
    }

    /// Index of the block starting exactly at `start`
    fn index_of(&self, start: usize) -> Option<usize> {
        self.blocks
            .binary_search_by_key(&start, |block| block.start)
            .ok()
    }

    /// The used block with the given id, if any
    pub fn block(&self, id: BlockId) -> Option<Block> {
        self.blocks.iter().find(|block| block.id() == Some(id)).copied()
    }

    /// The block starting exactly at `start`, if any
    pub fn block_at(&self, start: usize) -> Option<Block> {
        self.index_of(start).map(|idx| self.blocks[idx])
    }

    /// Iterate over copies of the blocks in ascending address order
    pub fn list_blocks(&self) -> Blocks<'_> {
        Blocks {
            inner: self.blocks.iter(),
        }
    }

    /// Compute fragmentation statistics for the current table
    pub fn stats(&self) -> MemoryStats {
        MemoryStats::collect(self.capacity, &self.blocks)
    }
}

/// Iterator over the block table, see [`Memory::list_blocks`]
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    inner: slice::Iter<'a, Block>,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Blocks<'_> {
    fn next_back(&mut self) -> Option<Block> {
        self.inner.next_back().copied()
    }
}

impl ExactSizeIterator for Blocks<'_> {}

impl FusedIterator for Blocks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn layout(memory: &Memory) -> Vec<(usize, usize, bool)> {
        memory
            .list_blocks()
            .map(|block| (block.start, block.size, block.is_used()))
            .collect()
    }

    #[test]
    fn test_new_rounds_capacity() {
        let memory = Memory::new(100).unwrap();
        assert_eq!(memory.capacity(), 128);
        assert_eq!(layout(&memory), vec![(0, 128, false)]);
        assert_eq!(memory.last_alloc_pos(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_capacity() {
        assert_eq!(Memory::new(0).unwrap_err(), SimError::InvalidCapacity);
        assert_eq!(Memory::new(usize::MAX).unwrap_err(), SimError::InvalidCapacity);
    }

    #[test]
    fn test_allocate_splits_left_first() {
        let mut memory = Memory::new(64).unwrap();
        let id = memory.allocate(10, FitStrategy::First).unwrap();
        assert_eq!(id, BlockId::new(1));
        assert_eq!(
            layout(&memory),
            vec![(0, 16, true), (16, 16, false), (32, 32, false)]
        );
        let block = memory.block(id).unwrap();
        assert_eq!(block.requested_size(), Some(10));
    }

    #[test]
    fn test_allocate_zero_is_invalid() {
        let mut memory = Memory::new(64).unwrap();
        assert_eq!(
            memory.allocate(0, FitStrategy::First),
            Err(SimError::InvalidRequest)
        );
        assert_eq!(memory.block_count(), 1);
    }

    #[test]
    fn test_allocate_whole_capacity() {
        let mut memory = Memory::new(64).unwrap();
        let id = memory.allocate(64, FitStrategy::Best).unwrap();
        assert_eq!(layout(&memory), vec![(0, 64, true)]);
        assert_eq!(
            memory.allocate(1, FitStrategy::First),
            Err(SimError::OutOfMemory { requested: 1 })
        );
        memory.free_by_id(id).unwrap();
        assert_eq!(layout(&memory), vec![(0, 64, false)]);
    }

    #[test]
    fn test_allocate_too_large() {
        let mut memory = Memory::new(64).unwrap();
        assert_eq!(
            memory.allocate(65, FitStrategy::Worst),
            Err(SimError::OutOfMemory { requested: 65 })
        );
        assert_eq!(
            memory.allocate(usize::MAX, FitStrategy::Worst),
            Err(SimError::OutOfMemory {
                requested: usize::MAX
            })
        );
        assert_eq!(layout(&memory), vec![(0, 64, false)]);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut memory = Memory::new(64).unwrap();
        let a = memory.allocate(8, FitStrategy::First).unwrap();
        memory.free_by_id(a).unwrap();
        let b = memory.allocate(8, FitStrategy::First).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, BlockId::new(2));
        assert_eq!(
            memory.free_by_id(a),
            Err(SimError::NotFound(Lookup::Id(a)))
        );
    }

    #[test]
    fn test_free_by_address_errors() {
        let mut memory = Memory::new(64).unwrap();
        memory.allocate(16, FitStrategy::First).unwrap();
        // 16 is the start of a free block
        assert_eq!(
            memory.free_by_address(16),
            Err(SimError::AlreadyFree { start: 16 })
        );
        // 8 is inside the used block, not a block start
        assert_eq!(
            memory.free_by_address(8),
            Err(SimError::NotFound(Lookup::Address(8)))
        );
        let freed = memory.free_by_address(0).unwrap();
        assert_eq!(freed.id(), Some(BlockId::new(1)));
        assert_eq!(layout(&memory), vec![(0, 64, false)]);
    }

    #[test]
    fn test_coalesce_cascades() {
        let mut memory = Memory::new(64).unwrap();
        let a = memory.allocate(8, FitStrategy::First).unwrap();
        let b = memory.allocate(8, FitStrategy::First).unwrap();
        let c = memory.allocate(16, FitStrategy::First).unwrap();
        assert_eq!(
            layout(&memory),
            vec![(0, 8, true), (8, 8, true), (16, 16, true), (32, 32, false)]
        );

        memory.free_by_id(a).unwrap();
        assert_eq!(memory.block_count(), 4);
        memory.free_by_id(c).unwrap();
        assert_eq!(
            layout(&memory),
            vec![(0, 8, false), (8, 8, true), (16, 16, false), (32, 32, false)]
        );
        memory.free_by_id(b).unwrap();
        assert_eq!(layout(&memory), vec![(0, 64, false)]);
    }

    #[test]
    fn test_adjacent_non_buddies_do_not_merge() {
        let mut memory = Memory::new(64).unwrap();
        let a = memory.allocate(16, FitStrategy::First).unwrap();
        let b = memory.allocate(16, FitStrategy::First).unwrap();
        let c = memory.allocate(16, FitStrategy::First).unwrap();
        // 16 and 32 are adjacent and equally sized, but not buddies
        memory.free_by_id(b).unwrap();
        memory.free_by_id(c).unwrap();
        assert_eq!(
            layout(&memory),
            vec![(0, 16, true), (16, 16, false), (32, 32, false)]
        );
        memory.free_by_id(a).unwrap();
        assert_eq!(layout(&memory), vec![(0, 64, false)]);
    }

    #[test]
    fn test_list_blocks_is_restartable() {
        let mut memory = Memory::new(32).unwrap();
        memory.allocate(4, FitStrategy::First).unwrap();
        let blocks = memory.list_blocks();
        assert_eq!(blocks.len(), 4);
        let again = blocks.clone();
        assert!(blocks.eq(again));
    }
}
