//! Block metadata
//!
//! Represents a contiguous range of the simulated address space with its
//! order, address and ownership information.

use core::fmt;

/// Opaque handle to an allocated block.
///
/// Identifiers are assigned from 1 upward and never reused by the same
/// [`Memory`](super::Memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ownership state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Used {
        id: BlockId,
        /// Size the caller asked for, before power-of-two rounding.
        requested_size: usize,
    },
}

/// Block metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub size: usize,
    pub state: BlockState,
}

impl Block {
    /// Create a new free block
    pub const fn free(start: usize, size: usize) -> Self {
        Self {
            start,
            size,
            state: BlockState::Free,
        }
    }

    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    pub const fn is_used(&self) -> bool {
        matches!(self.state, BlockState::Used { .. })
    }

    pub const fn is_free(&self) -> bool {
        !self.is_used()
    }

    pub const fn id(&self) -> Option<BlockId> {
        match self.state {
            BlockState::Used { id, .. } => Some(id),
            BlockState::Free => None,
        }
    }

    pub const fn requested_size(&self) -> Option<usize> {
        match self.state {
            BlockState::Used { requested_size, .. } => Some(requested_size),
            BlockState::Free => None,
        }
    }

    /// Order of the block, i.e. `log2(size)`.
    pub const fn order(&self) -> u32 {
        self.size.trailing_zeros()
    }

    /// Calculate the buddy address for this block
    /// The buddy is the other half of the parent block at the next higher order.
    /// For a block of size S at address A, its buddy is at A ^ S.
    pub const fn buddy_start(&self) -> usize {
        self.start ^ self.size
    }

    /// Whether `other` is the buddy of this block at the same order.
    pub const fn is_buddy_of(&self, other: &Block) -> bool {
        self.size == other.size && self.buddy_start() == other.start
    }

    /// Bytes lost to power-of-two rounding, zero for free blocks.
    pub const fn internal_fragmentation(&self) -> usize {
        match self.state {
            BlockState::Used { requested_size, .. } => self.size - requested_size,
            BlockState::Free => 0,
        }
    }

    /// Split this block into its left and right halves, both free.
    pub(crate) const fn split(&self) -> (Block, Block) {
        let half = self.size / 2;
        (
            Block::free(self.start, half),
            Block::free(self.start + half, half),
        )
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            BlockState::Used { id, requested_size } => write!(
                f,
                "[id={}] @{} +{}B (requested={}B)",
                id, self.start, self.size, requested_size
            ),
            BlockState::Free => write!(f, "[free] @{} +{}B", self.start, self.size),
        }
    }
}
