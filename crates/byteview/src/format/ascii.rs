//! ASCII character format.
use num_bigint::BigUint;

use super::DataFormatModel;
use crate::block::ByteBlock;
use crate::error::ByteBlockError;

/// One byte per unit, printed as its ASCII character or `.`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiFormatModel;

fn printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

impl DataFormatModel for AsciiFormatModel {
    fn name(&self) -> &str {
        "Ascii"
    }

    fn unit_byte_size(&self) -> usize {
        1
    }

    fn data_unit_symbol_size(&self) -> usize {
        1
    }

    fn data_representation(
        &self,
        block: &dyn ByteBlock,
        offset: &BigUint,
    ) -> Result<String, ByteBlockError> {
        let b = block.get_byte(offset)?;
        let ch = if printable(b) { b as char } else { '.' };
        Ok(ch.to_string())
    }

    fn column_position(&self, _block: &dyn ByteBlock, _byte_offset: usize) -> usize {
        0
    }

    fn byte_offset(&self, _block: &dyn ByteBlock, _column: usize) -> usize {
        0
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
        if column != 0 || !ch.is_ascii() || !printable(ch as u8) {
            return Ok(false);
        }
        block.set_byte(offset, ch as u8)?;
        Ok(true)
    }
}
