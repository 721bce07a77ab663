//! Fit strategies
//!
//! Selects which free block an allocation is carved from. Selection is a pure
//! function of the block table, the request size and the next-fit cursor.

use core::cmp::Reverse;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "log")]
use log::trace;

use super::block::Block;

/// Block selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitStrategy {
    /// Lowest address that fits.
    First,
    /// Smallest block that fits.
    Best,
    /// Largest block that fits.
    Worst,
    /// Lowest address at or after the last allocation, wrapping to the start.
    Next,
}

impl FitStrategy {
    pub const ALL: [FitStrategy; 4] = [
        FitStrategy::First,
        FitStrategy::Best,
        FitStrategy::Worst,
        FitStrategy::Next,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FitStrategy::First => "first",
            FitStrategy::Best => "best",
            FitStrategy::Worst => "worst",
            FitStrategy::Next => "next",
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized strategy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown fit strategy, expected first|best|worst|next")]
pub struct ParseStrategyError;

impl FromStr for FitStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        FitStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or(ParseStrategyError)
    }
}

/// Choose a free block of at least `min_size` bytes.
///
/// Only free blocks with `size >= min_size` are candidates, for every
/// strategy. Ties on size (best/worst fit) go to the lowest start address.
/// `cursor` is only consulted by [`FitStrategy::Next`]: the first candidate
/// starting at or after it wins, otherwise the search wraps around to the
/// lowest-addressed candidate.
///
/// Returns `None` when no candidate exists.
pub fn choose<'a, I>(
    blocks: I,
    min_size: usize,
    strategy: FitStrategy,
    cursor: usize,
) -> Option<Block>
where
    I: IntoIterator<Item = &'a Block>,
{
    let candidates = blocks
        .into_iter()
        .filter(|block| block.is_free() && block.size >= min_size);

    let chosen = match strategy {
        FitStrategy::First => candidates.min_by_key(|block| block.start),
        FitStrategy::Best => candidates.min_by_key(|block| (block.size, block.start)),
        FitStrategy::Worst => candidates.min_by_key(|block| (Reverse(block.size), block.start)),
        // `false` sorts first: blocks past the cursor before the wrapped ones
        FitStrategy::Next => candidates.min_by_key(|block| (block.start < cursor, block.start)),
    };

    trace!(
        "fit: strategy={} min_size={} cursor={} -> {:?}",
        strategy,
        min_size,
        cursor,
        chosen.map(|block| block.start)
    );

    chosen.copied()
}
