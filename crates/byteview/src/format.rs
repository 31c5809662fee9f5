//! Data format models: how one addressable unit is printed.
//!
//! A model knows how many bytes make up one unit (`unit_byte_size`), how
//! many characters that unit prints as (`data_unit_symbol_size`), how to
//! render it, and where each byte of the unit sits within the printed text
//! so the cursor can land on a sub-unit column.
//!
//! The renderer depends only on the `DataFormatModel` trait. The variants
//! shipped here are:
//!
//! - `HexFormatModel`: 1, 2, 4 or 8 byte groups, two symbols per byte
//! - `AsciiFormatModel`: printable ASCII, `.` for everything else
//! - `RadixFormatModel`: octal, decimal and binary single-byte units
//!
//! Use `create_model` to build a model from its display name (the name is
//! what the config state persists).
mod ascii;
mod hex;
mod radix;

use std::fmt;
use std::rc::Rc;

use num_bigint::BigUint;

use crate::block::ByteBlock;
use crate::error::{ByteBlockError, StateError};

pub use ascii::AsciiFormatModel;
pub use hex::HexFormatModel;
pub use radix::{Radix, RadixFormatModel};

/// Display names of every built-in model, in menu order.
pub const FORMAT_NAMES: [&str; 5] = ["Hex", "Ascii", "Octal", "Decimal", "Binary"];

/// Formatting contract for one view.
pub trait DataFormatModel: fmt::Debug {
    /// Display name, also used as the persisted view name.
    fn name(&self) -> &str;

    /// Bytes per addressable unit.
    fn unit_byte_size(&self) -> usize;

    /// Characters per printed unit.
    fn data_unit_symbol_size(&self) -> usize;

    /// Printable representation of the unit starting at `offset`.
    fn data_representation(
        &self,
        block: &dyn ByteBlock,
        offset: &BigUint,
    ) -> Result<String, ByteBlockError>;

    /// Character column within the printed unit where byte `byte_offset` of
    /// the unit begins.
    fn column_position(&self, block: &dyn ByteBlock, byte_offset: usize) -> usize;

    /// Inverse of `column_position`: the byte of the unit shown at `column`.
    fn byte_offset(&self, block: &dyn ByteBlock, column: usize) -> usize;

    fn is_editable(&self) -> bool {
        false
    }

    /// Replace the symbol at `column` of the unit at `offset` with `ch`.
    ///
    /// Returns `Ok(false)` when `ch` is not a valid symbol for this format.
    fn replace_value(
        &self,
        _block: &dyn ByteBlock,
        _offset: &BigUint,
        _column: usize,
        _ch: char,
    ) -> Result<bool, ByteBlockError> {
        Ok(false)
    }
}

/// Build a model by display name. `hex_group_size` only applies to `Hex`.
pub fn create_model(
    name: &str,
    hex_group_size: usize,
) -> Result<Rc<dyn DataFormatModel>, StateError> {
    let model: Rc<dyn DataFormatModel> = match name {
        "Hex" => Rc::new(HexFormatModel::new(hex_group_size)),
        "Ascii" => Rc::new(AsciiFormatModel),
        "Octal" => Rc::new(RadixFormatModel::new(Radix::Octal)),
        "Decimal" => Rc::new(RadixFormatModel::new(Radix::Decimal)),
        "Binary" => Rc::new(RadixFormatModel::new(Radix::Binary)),
        other => return Err(StateError::UnknownFormat(other.to_string())),
    };
    Ok(model)
}

/// Read `len` consecutive bytes starting at `offset`, in memory order.
pub(crate) fn read_unit(
    block: &dyn ByteBlock,
    offset: &BigUint,
    len: usize,
) -> Result<Vec<u8>, ByteBlockError> {
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(block.get_byte(&(offset + BigUint::from(i)))?);
    }
    Ok(out)
}
