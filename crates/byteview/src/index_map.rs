//! Translation from the dense row index space to `(block, offset)` pairs.
//!
//! The display is a grid of rows, each `bytes_per_line` field slots wide.
//! Rows are laid out block by block:
//!
//! ```text
//! row 0  | ram:0000  .. .. .. 41 42 43 ..   <- first row left-padded
//! row 1  | ram:0008  44 45 46 47 48 49 4A 4B
//! row 2  | ram:0010  4C 4D                  <- block ends mid-row
//! row 3  | .. .. .. .. .. .. .. ..          <- separator row
//! row 4  | io:8000   00 01 02 03 04 05 06 07
//! ```
//!
//! - Every block starts on a new row. Its first row is padded by
//!   `(base - block_offset) mod bytes_per_line` slots so that row boundaries
//!   fall on addresses congruent to `block_offset`.
//! - One separator row is inserted between consecutive blocks. Separator
//!   rows resolve to no block but report `show_separator == true`, so the
//!   renderer can keep the columns visually aligned.
//! - Padding slots, slots past the end of a block and indices past the last
//!   row resolve to nothing and show nothing.
//!
//! Resolution is a pure function of the block set captured at construction;
//! it never reads byte values.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::block::{ByteBlock, ByteBlockSet};

/// Resolved address of one field slot: a block and an offset into it.
#[derive(Clone)]
pub struct ByteBlockInfo {
    block: Rc<dyn ByteBlock>,
    offset: BigUint,
}

impl ByteBlockInfo {
    pub fn new(block: Rc<dyn ByteBlock>, offset: BigUint) -> Self {
        Self { block, offset }
    }

    pub fn block(&self) -> &Rc<dyn ByteBlock> {
        &self.block
    }

    pub fn offset(&self) -> &BigUint {
        &self.offset
    }
}

impl fmt::Debug for ByteBlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBlockInfo")
            .field("block", &self.block.name())
            .field("offset", &self.offset)
            .finish()
    }
}

impl PartialEq for ByteBlockInfo {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.block, &other.block) && self.offset == other.offset
    }
}

/// Rows occupied by one block.
#[derive(Debug)]
struct BlockRows {
    block: Rc<dyn ByteBlock>,
    start_row: BigUint,
    /// Exclusive.
    end_row: BigUint,
    pad: usize,
}

/// Maps row indices to block offsets for one block set and line geometry.
#[derive(Debug)]
pub struct IndexMap {
    block_set: Rc<dyn ByteBlockSet>,
    bytes_per_line: usize,
    block_offset: usize,
    /// Keyed by each block's first row.
    rows: BTreeMap<BigUint, BlockRows>,
    separators: BTreeSet<BigUint>,
    num_indexes: BigUint,
}

impl IndexMap {
    /// Lay out `block_set` with `bytes_per_line` slots per row and row
    /// boundaries aligned to `block_offset`. Empty blocks are skipped.
    pub fn new(block_set: Rc<dyn ByteBlockSet>, bytes_per_line: usize, block_offset: usize) -> Self {
        let bytes_per_line = bytes_per_line.max(1);
        let bpl = BigUint::from(bytes_per_line);

        let mut rows = BTreeMap::new();
        let mut separators = BTreeSet::new();
        let mut next_row = BigUint::zero();

        for block in block_set.blocks().iter().filter(|b| !b.length().is_zero()) {
            if !rows.is_empty() {
                separators.insert(next_row.clone());
                next_row += 1u32;
            }
            let pad = leading_pad(&block.base(), bytes_per_line, block_offset);
            let slots = block.length() + BigUint::from(pad);
            let row_count = (&slots + &bpl - BigUint::one()) / &bpl;
            let end_row = &next_row + row_count;
            rows.insert(
                next_row.clone(),
                BlockRows {
                    block: Rc::clone(block),
                    start_row: next_row,
                    end_row: end_row.clone(),
                    pad,
                },
            );
            next_row = end_row;
        }

        Self {
            block_set,
            bytes_per_line,
            block_offset,
            rows,
            separators,
            num_indexes: next_row,
        }
    }

    pub fn block_set(&self) -> &Rc<dyn ByteBlockSet> {
        &self.block_set
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    pub fn block_offset(&self) -> usize {
        self.block_offset
    }

    /// Total number of rows, separators included.
    pub fn num_indexes(&self) -> &BigUint {
        &self.num_indexes
    }

    /// Resolve the field slot `field_offset` of row `index`.
    pub fn get_block_info(&self, index: &BigUint, field_offset: usize) -> Option<ByteBlockInfo> {
        if field_offset >= self.bytes_per_line {
            return None;
        }
        let seg = self.segment(index)?;
        let slot = (index - &seg.start_row) * BigUint::from(self.bytes_per_line)
            + BigUint::from(field_offset);
        let pad = BigUint::from(seg.pad);
        if slot < pad {
            return None;
        }
        let offset = slot - pad;
        if offset >= seg.block.length() {
            return None;
        }
        Some(ByteBlockInfo::new(Rc::clone(&seg.block), offset))
    }

    /// True for the separator rows placed between blocks.
    pub fn show_separator(&self, index: &BigUint) -> bool {
        self.separators.contains(index)
    }

    /// Inverse mapping: the row and field slot holding `offset` of the block
    /// named `block_name`.
    pub fn index_of(&self, block_name: &str, offset: &BigUint) -> Option<(BigUint, usize)> {
        let seg = self.rows.values().find(|s| s.block.name() == block_name)?;
        if offset >= &seg.block.length() {
            return None;
        }
        let bpl = BigUint::from(self.bytes_per_line);
        let slot = offset + BigUint::from(seg.pad);
        let row = &seg.start_row + &slot / &bpl;
        // The remainder is below bytes_per_line and always fits.
        let field = (&slot % &bpl).to_usize().unwrap_or(0);
        Some((row, field))
    }

    /// Address text of the first real byte in row `index`, or `None` for
    /// separator rows and indices outside every block.
    pub fn row_label(&self, index: &BigUint) -> Option<String> {
        let seg = self.segment(index)?;
        let slot = (index - &seg.start_row) * BigUint::from(self.bytes_per_line);
        let pad = BigUint::from(seg.pad);
        let offset = if slot < pad { BigUint::zero() } else { slot - pad };
        if offset >= seg.block.length() {
            return None;
        }
        Some(seg.block.location_representation(&offset))
    }

    /// First row of the block named `block_name`.
    pub fn block_start(&self, block_name: &str) -> Option<&BigUint> {
        self.rows
            .values()
            .find(|s| s.block.name() == block_name)
            .map(|s| &s.start_row)
    }

    fn segment(&self, index: &BigUint) -> Option<&BlockRows> {
        let (_, seg) = self.rows.range(..=index.clone()).next_back()?;
        if index >= &seg.end_row {
            return None;
        }
        Some(seg)
    }
}

/// Number of empty slots before a block's first byte.
fn leading_pad(base: &BigUint, bytes_per_line: usize, block_offset: usize) -> usize {
    let base_mod = (base % BigUint::from(bytes_per_line)).to_usize().unwrap_or(0);
    let shift = block_offset % bytes_per_line;
    (base_mod + bytes_per_line - shift) % bytes_per_line
}
