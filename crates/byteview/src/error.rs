//! Error types shared by the block, persistence and provider layers.
//!
//! The rendering path never surfaces these to its caller: `FieldFactory`
//! converts every `ByteBlockError` into a placeholder field. The other
//! layers return them through `Result` so hosts can decide how loudly to
//! report a failure.
use num_bigint::BigUint;
use thiserror::Error;

use crate::plugin::ProviderId;

/// Failure raised by a `ByteBlock` while reading or writing a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ByteBlockError {
    /// The block has no initialized value at `offset`, or denies the read.
    #[error("no accessible value in block `{block}` at offset 0x{offset:X}")]
    Access { block: String, offset: BigUint },

    /// The address computed for `offset` lies outside the block's address range.
    #[error("address out of bounds in block `{block}` at offset 0x{offset:X}")]
    AddressOutOfBounds { block: String, offset: BigUint },

    /// A unit read ran past the end of the underlying storage.
    ///
    /// - `index` is the byte index that was attempted.
    /// - `length` is the number of bytes the block holds.
    #[error("index {index} out of bounds (length {length})")]
    IndexOutOfBounds { index: BigUint, length: BigUint },

    /// The block does not accept edits.
    #[error("block `{block}` is read-only")]
    ReadOnly { block: String },
}

/// Failure while encoding or decoding persisted viewer state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// A view name in the config state does not match any known format model.
    #[error("unknown data format `{0}`")]
    UnknownFormat(String),

    /// A key holds a value that cannot be interpreted.
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: String, value: String },
}

/// Top-level error for provider and plugin operations.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Block(#[from] ByteBlockError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("no data source is attached")]
    NotAttached,

    #[error("provider {0} has been disposed")]
    Disposed(ProviderId),

    #[error("view is not editable")]
    NotEditable,

    /// Bytes per line must be a positive multiple of every view's unit size.
    #[error("{bytes_per_line} bytes per line is not a multiple of unit size {unit}")]
    InvalidBytesPerLine { bytes_per_line: usize, unit: usize },

    #[error("no provider with id {0}")]
    UnknownProvider(ProviderId),
}
