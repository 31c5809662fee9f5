//! Octal, decimal and binary single-byte formats.
use num_bigint::BigUint;

use super::DataFormatModel;
use crate::block::ByteBlock;
use crate::error::ByteBlockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Octal,
    Decimal,
    Binary,
}

/// One byte per unit printed in a fixed-width radix representation.
#[derive(Debug, Clone)]
pub struct RadixFormatModel {
    radix: Radix,
}

impl RadixFormatModel {
    pub fn new(radix: Radix) -> Self {
        Self { radix }
    }

    pub fn radix(&self) -> Radix {
        self.radix
    }
}

impl DataFormatModel for RadixFormatModel {
    fn name(&self) -> &str {
        match self.radix {
            Radix::Octal => "Octal",
            Radix::Decimal => "Decimal",
            Radix::Binary => "Binary",
        }
    }

    fn unit_byte_size(&self) -> usize {
        1
    }

    fn data_unit_symbol_size(&self) -> usize {
        match self.radix {
            Radix::Octal | Radix::Decimal => 3,
            Radix::Binary => 8,
        }
    }

    fn data_representation(
        &self,
        block: &dyn ByteBlock,
        offset: &BigUint,
    ) -> Result<String, ByteBlockError> {
        let b = block.get_byte(offset)?;
        Ok(match self.radix {
            Radix::Octal => format!("{:03o}", b),
            Radix::Decimal => format!("{:>3}", b),
            Radix::Binary => format!("{:08b}", b),
        })
    }

    fn column_position(&self, _block: &dyn ByteBlock, _byte_offset: usize) -> usize {
        0
    }

    fn byte_offset(&self, _block: &dyn ByteBlock, _column: usize) -> usize {
        0
    }

    // Only binary has one symbol per bit, so only binary edits in place.
    fn is_editable(&self) -> bool {
        self.radix == Radix::Binary
    }

    fn replace_value(
        &self,
        block: &dyn ByteBlock,
        offset: &BigUint,
        column: usize,
        ch: char,
    ) -> Result<bool, ByteBlockError> {
        if self.radix != Radix::Binary || column >= 8 {
            return Ok(false);
        }
        let bit = 7 - column;
        let old = block.get_byte(offset)?;
        let new = match ch {
            '0' => old & !(1 << bit),
            '1' => old | (1 << bit),
            _ => return Ok(false),
        };
        block.set_byte(offset, new)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryByteBlock;

    #[test]
    fn fixed_width_representations() {
        let block = MemoryByteBlock::new("ram", 0u32, vec![0x41]);
        let zero = BigUint::from(0u32);
        let octal = RadixFormatModel::new(Radix::Octal);
        let decimal = RadixFormatModel::new(Radix::Decimal);
        let binary = RadixFormatModel::new(Radix::Binary);
        assert_eq!(octal.data_representation(&block, &zero).unwrap(), "101");
        assert_eq!(decimal.data_representation(&block, &zero).unwrap(), " 65");
        assert_eq!(binary.data_representation(&block, &zero).unwrap(), "01000001");
        assert_eq!(binary.data_unit_symbol_size(), 8);
    }

    #[test]
    fn binary_edits_single_bits() {
        let block = MemoryByteBlock::new("ram", 0u32, vec![0x00]);
        let zero = BigUint::from(0u32);
        let binary = RadixFormatModel::new(Radix::Binary);
        assert!(binary.replace_value(&block, &zero, 0, '1').unwrap());
        assert!(binary.replace_value(&block, &zero, 7, '1').unwrap());
        assert_eq!(block.get_byte(&zero).unwrap(), 0x81);
        assert!(!binary.replace_value(&block, &zero, 3, '2').unwrap());

        let decimal = RadixFormatModel::new(Radix::Decimal);
        assert!(!decimal.is_editable());
        assert!(!decimal.replace_value(&block, &zero, 0, '1').unwrap());
    }
}
