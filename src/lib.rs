//! Buddy Fit Simulator
//!
//! This crate models the internals of a buddy memory allocator over a
//! simulated address space, featuring:
//! - Power-of-two buddy splitting and coalescing
//! - First-fit, best-fit, worst-fit and next-fit block selection
//! - Internal/external fragmentation statistics
//! - A text command parser and memory-map renderer for interactive use
//!
//! No bytes are stored: blocks are address ranges with ownership metadata.

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

use core::fmt;

/// How a failed free looked up its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// By allocation identifier.
    Id(BlockId),
    /// By block start address.
    Address(usize),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "id {}", id),
            Lookup::Address(addr) => write!(f, "address {}", addr),
        }
    }
}

/// The error type used by the simulated allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// Capacity is zero or cannot be rounded to a power of two.
    #[error("invalid capacity: must be non-zero and round to a power of two")]
    InvalidCapacity,
    /// Requested size is zero.
    #[error("invalid request: size must be greater than zero")]
    InvalidRequest,
    /// No free block is large enough.
    #[error("out of memory: no free block for {requested} bytes")]
    OutOfMemory { requested: usize },
    /// No block matches the given id or address.
    #[error("no allocated block with {0}")]
    NotFound(Lookup),
    /// The block at the given address is already free.
    #[error("block at address {start} is already free")]
    AlreadyFree { start: usize },
}

/// A [`Result`] type with [`SimError`] as the error type.
pub type SimResult<T = ()> = Result<T, SimError>;

/// Rounds `n` up to the next power of two, `None` on overflow.
///
/// Zero rounds to one, matching how a zero-sized block would still occupy
/// the smallest order.
#[inline]
pub const fn round_up_pow2(n: usize) -> Option<usize> {
    if n == 0 {
        return Some(1);
    }
    n.checked_next_power_of_two()
}

/// Checks whether the address has the demanded alignment.
///
/// Equivalent to `addr % align == 0`, but the alignment must be a power of two.
#[inline]
pub(crate) const fn is_aligned(addr: usize, align: usize) -> bool {
    addr & (align - 1) == 0
}

pub mod buddy;
pub use buddy::{choose, Block, BlockId, BlockState, Blocks, FitStrategy, Memory, MemoryStats};

pub mod render;
pub use render::{render_map, DEFAULT_MAP_WIDTH};

pub mod command;
pub use command::{Command, CommandError};
