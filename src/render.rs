//! Textual memory map.
//!
//! Draws the block table as two rows of characters: occupancy (`#` used,
//! `.` free) and the id owning each column, followed by the list of active
//! blocks.

use alloc::string::String;
use core::fmt::Write;

use crate::buddy::{Block, Memory};

/// Default number of columns of the memory map.
pub const DEFAULT_MAP_WIDTH: usize = 80;

/// Render the memory map of `memory` in at most `width` columns.
///
/// When the capacity fits in `width`, each column is one byte. Otherwise the
/// space is cut into `width` segments of `ceil(capacity / width)` bytes and a
/// segment shows the first used block overlapping it. A `width` of zero is
/// treated as one column.
pub fn render_map(memory: &Memory, width: usize) -> String {
    let width = width.max(1);
    let capacity = memory.capacity();
    let used: alloc::vec::Vec<Block> = memory.list_blocks().filter(Block::is_used).collect();

    let (title, columns, segment) = if capacity <= width {
        ("Memory map (1 char = 1 byte)", capacity, 1)
    } else {
        ("Compact memory map", width, capacity.div_ceil(width))
    };

    let mut occupancy = String::with_capacity(columns);
    let mut owners = String::with_capacity(columns * 2);
    for column in 0..columns {
        let start = column * segment;
        let end = capacity.min(start + segment);
        let owner = used
            .iter()
            .find(|block| block.start < end && block.end() > start);

        if column > 0 {
            owners.push(' ');
        }
        match owner.and_then(Block::id) {
            Some(id) => {
                occupancy.push('#');
                let _ = write!(owners, "{}", id);
            }
            None => {
                occupancy.push('.');
                owners.push('.');
            }
        }
    }

    let mut out = String::new();
    let ruler = "-".repeat(columns);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", ruler);
    let _ = writeln!(out, "{}", occupancy);
    let _ = writeln!(out, "{}", owners);
    let _ = writeln!(out, "{}", ruler);

    if used.is_empty() {
        out.push_str("\nno allocated blocks\n");
    } else {
        out.push_str("\nactive blocks:\n");
        for block in &used {
            let _ = writeln!(out, "{}", block);
        }
    }
    out
}
