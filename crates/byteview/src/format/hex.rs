//! Hexadecimal format with configurable byte grouping.
use num_bigint::BigUint;

use super::{DataFormatModel, read_unit};
use crate::block::ByteBlock;
use crate::error::ByteBlockError;

/// Prints `group_size` bytes as one hex unit (`2 * group_size` symbols).
///
/// Bytes are shown most significant first: for little-endian blocks the last
/// byte in memory is printed first.
#[derive(Debug, Clone)]
pub struct HexFormatModel {
    group_size: usize,
}

impl HexFormatModel {
    /// Group sizes other than 1, 2, 4 or 8 fall back to 1.
    pub fn new(group_size: usize) -> Self {
        let group_size = match group_size {
            1 | 2 | 4 | 8 => group_size,
            _ => 1,
        };
        Self { group_size }
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }
}

impl Default for HexFormatModel {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DataFormatModel for HexFormatModel {
    fn name(&self) -> &str {
        "Hex"
    }

    fn unit_byte_size(&self) -> usize {
        self.group_size
    }

    fn data_unit_symbol_size(&self) -> usize {
        self.group_size * 2
    }

    fn data_representation(
        &self,
        block: &dyn ByteBlock,
        offset: &BigUint,
    ) -> Result<String, ByteBlockError> {
        let mut bytes = read_unit(block, offset, self.group_size)?;
        if !block.is_big_endian() {
            bytes.reverse();
        }
        Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    fn column_position(&self, block: &dyn ByteBlock, byte_offset: usize) -> usize {
        let byte_offset = byte_offset.min(self.group_size - 1);
        if block.is_big_endian() {
            byte_offset * 2
        } else {
            (self.group_size - 1 - byte_offset) * 2
        }
    }

    fn byte_offset(&self, block: &dyn ByteBlock, column: usize) -> usize {
        let printed = (column / 2).min(self.group_size - 1);
        if block.is_big_endian() {
            printed
        } else {
            self.group_size - 1 - printed
        }
    }

    fn is_editable(&self) -> bool {
        true
    }

    fn replace_value(
        &self,
        block: &dyn ByteBlock,
        offset: &BigUint,
        column: usize,
        ch: char,
    ) -> Result<bool, ByteBlockError> {
        let Some(digit) = ch.to_digit(16) else {
            return Ok(false);
        };
        if column >= self.data_unit_symbol_size() {
            return Ok(false);
        }
        let target = offset + BigUint::from(self.byte_offset(block, column));
        let old = block.get_byte(&target)?;
        let digit = digit as u8;
        let new = if column % 2 == 0 {
            (digit << 4) | (old & 0x0F)
        } else {
            (old & 0xF0) | digit
        };
        block.set_byte(&target, new)?;
        Ok(true)
    }
}
