//! Statistics for the simulated allocator
//!
//! Provides fragmentation statistics and a log reporter.

use core::fmt;

#[cfg(feature = "log")]
use log::info;

use super::block::Block;

/// Maximum order supported (a block of `2^MAX_ORDER` bytes)
pub const MAX_ORDER: usize = usize::BITS as usize - 1;

/// Memory statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStats {
    pub capacity: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    /// Number of free blocks, the external fragmentation proxy.
    pub hole_count: usize,
    /// Sum of `size - requested_size` over used blocks.
    pub internal_fragmentation_bytes: usize,
    /// Requested bytes over capacity, in percent.
    pub effective_usage_pct: f64,
    pub largest_free_block: usize,
    pub free_blocks_by_order: [usize; MAX_ORDER + 1],
}

impl MemoryStats {
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used_bytes: 0,
            free_bytes: 0,
            hole_count: 0,
            internal_fragmentation_bytes: 0,
            effective_usage_pct: 0.0,
            largest_free_block: 0,
            free_blocks_by_order: [0; MAX_ORDER + 1],
        }
    }

    /// Compute statistics from a block table.
    pub fn collect<'a, I>(capacity: usize, blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Block>,
    {
        let mut stats = Self::new(capacity);
        let mut requested_bytes = 0usize;

        for block in blocks {
            match block.requested_size() {
                Some(requested) => {
                    stats.used_bytes += block.size;
                    stats.internal_fragmentation_bytes += block.size - requested;
                    requested_bytes += requested;
                }
                None => {
                    stats.free_bytes += block.size;
                    stats.hole_count += 1;
                    stats.largest_free_block = stats.largest_free_block.max(block.size);
                    stats.free_blocks_by_order[block.order() as usize] += 1;
                }
            }
        }

        if capacity > 0 {
            stats.effective_usage_pct = requested_bytes as f64 / capacity as f64 * 100.0;
        }
        stats
    }

    /// Bytes actually requested by callers across all used blocks.
    pub fn requested_bytes(&self) -> usize {
        self.used_bytes - self.internal_fragmentation_bytes
    }
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Statistics ==")?;
        writeln!(f, "Total size: {} bytes", self.capacity)?;
        writeln!(f, "Used: {} | Free: {}", self.used_bytes, self.free_bytes)?;
        writeln!(f, "Holes (external fragmentation): {}", self.hole_count)?;
        writeln!(
            f,
            "Internal fragmentation: {} bytes",
            self.internal_fragmentation_bytes
        )?;
        write!(f, "Effective usage: {:.2}%", self.effective_usage_pct)
    }
}

/// Detailed memory statistics reporter
pub struct StatsReporter;

impl StatsReporter {
    /// Log the statistics report, followed by the free block distribution
    #[allow(unused_variables)]
    pub fn log_report(stats: &MemoryStats) {
        info!("========================================");
        info!("Capacity: {} bytes", stats.capacity);
        info!(
            "  Used: {} bytes, Free: {} bytes",
            stats.used_bytes,
            stats.free_bytes
        );
        info!(
            "  Holes: {}, largest free block: {} bytes",
            stats.hole_count,
            stats.largest_free_block
        );
        info!(
            "  Internal fragmentation: {} bytes",
            stats.internal_fragmentation_bytes
        );
        info!("  Effective usage: {:.2}%", stats.effective_usage_pct);
        info!("  Free blocks by order:");

        for order in (0..=MAX_ORDER).rev() {
            let count = stats.free_blocks_by_order[order];
            if count > 0 {
                info!(
                    "    Order {}: {} blocks ({} bytes each)",
                    order,
                    count,
                    1usize << order
                );
            }
        }
        info!("========================================");
    }
}
