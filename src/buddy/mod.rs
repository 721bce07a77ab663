//! Buddy allocation engine
//!
//! This module provides the simulated buddy system with:
//! - An address-sorted block table that always tiles the address space
//! - Pluggable fit strategies for choosing the block to split
//! - Fragmentation statistics and reporting

pub mod block;
pub mod fit;
pub mod memory;
pub mod stats;

pub use block::{Block, BlockId, BlockState};
pub use fit::{choose, FitStrategy, ParseStrategyError};
pub use memory::{Blocks, Memory};
pub use stats::{MemoryStats, StatsReporter, MAX_ORDER};
