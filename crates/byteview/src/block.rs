//! Addressable byte ranges ("blocks") and ordered collections of them.
//!
//! A `ByteBlock` is the unit the viewer reads from: it answers whether an
//! offset holds an initialized value, returns the raw byte, and reports
//! whether a byte differs from the block's edit baseline. Blocks are shared
//! by reference (`Rc<dyn ByteBlock>`) between the block set, the index map
//! and every rendered field, so mutation goes through interior mutability.
//!
//! `MemoryByteBlock` and `MemoryBlockSet` are the in-memory implementations
//! used by the debugger front end and the tests. Hosts with their own memory
//! model implement the two traits directly.
use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::error::ByteBlockError;

/// One addressable byte range.
pub trait ByteBlock: fmt::Debug {
    /// Durable name of the block (stable across reloads, used in saved state).
    fn name(&self) -> &str;

    /// Address of the first byte of this block.
    fn base(&self) -> BigUint;

    /// Number of bytes in this block.
    fn length(&self) -> BigUint;

    /// Returns true when the block holds an initialized value at `offset`.
    ///
    /// This must be cheap: the renderer calls it before every read so that
    /// uninitialized memory never goes through the failure path.
    fn has_value(&self, offset: &BigUint) -> bool;

    /// Read the byte at `offset`.
    fn get_byte(&self, offset: &BigUint) -> Result<u8, ByteBlockError>;

    /// Overwrite the byte at `offset`.
    fn set_byte(&self, offset: &BigUint, value: u8) -> Result<(), ByteBlockError>;

    /// Returns true if any byte in `offset..offset + len` differs from the
    /// block's edit baseline.
    fn is_changed(&self, offset: &BigUint, len: usize) -> bool;

    /// Byte order used when a format model groups several bytes into one unit.
    fn is_big_endian(&self) -> bool {
        false
    }

    /// Human readable address for `offset`, e.g. `ram:00000010`.
    fn location_representation(&self, offset: &BigUint) -> String {
        format!("{}:{:08X}", self.name(), self.base() + offset)
    }
}

/// Ordered collection of blocks forming one view's addressable universe.
pub trait ByteBlockSet: fmt::Debug {
    /// All blocks, in display order.
    fn blocks(&self) -> &[Rc<dyn ByteBlock>];

    /// Look up a block by its durable name.
    fn block_by_name(&self, name: &str) -> Option<&Rc<dyn ByteBlock>> {
        self.blocks().iter().find(|b| b.name() == name)
    }

    /// Returns true when `block` is one of this set's blocks.
    fn contains(&self, block: &dyn ByteBlock) -> bool {
        self.block_by_name(block.name()).is_some()
    }

    /// Change query for one addressed unit. Delegates to the owning block's
    /// own baseline; blocks from a different set are never reported changed.
    fn is_changed(&self, block: &dyn ByteBlock, offset: &BigUint, unit_byte_size: usize) -> bool {
        self.contains(block) && block.is_changed(offset, unit_byte_size)
    }
}

/// In-memory block with an edit baseline and optional uninitialized ranges.
pub struct MemoryByteBlock {
    name: String,
    base: BigUint,
    bytes: RefCell<Vec<u8>>,
    baseline: RefCell<Vec<u8>>,
    /// Byte ranges (local indices) that hold no initialized value.
    uninitialized: Vec<Range<usize>>,
    read_only: bool,
    big_endian: bool,
}

impl MemoryByteBlock {
    /// Create a block named `name` at address `base` holding `bytes`.
    /// The initial contents become the edit baseline.
    pub fn new(name: impl Into<String>, base: impl Into<BigUint>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            baseline: RefCell::new(bytes.clone()),
            bytes: RefCell::new(bytes),
            uninitialized: Vec::new(),
            read_only: false,
            big_endian: false,
        }
    }

    /// Create a block of `len` bytes with no initialized values at all.
    pub fn uninitialized(name: impl Into<String>, base: impl Into<BigUint>, len: usize) -> Self {
        Self::new(name, base, vec![0; len]).with_uninitialized(0..len)
    }

    /// Mark a local byte range as uninitialized.
    pub fn with_uninitialized(mut self, range: Range<usize>) -> Self {
        if !range.is_empty() {
            self.uninitialized.push(range);
        }
        self
    }

    /// Reject edits.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Group multi-byte units most significant byte first.
    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    /// Accept the current contents as the new baseline (e.g. after a save).
    pub fn commit_baseline(&self) {
        let current = self.bytes.borrow().clone();
        *self.baseline.borrow_mut() = current;
    }

    /// Discard edits and return to the baseline contents.
    pub fn revert(&self) {
        let baseline = self.baseline.borrow().clone();
        *self.bytes.borrow_mut() = baseline;
    }

    /// Number of bytes as a native length.
    pub fn len(&self) -> usize {
        self.bytes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn local_index(&self, offset: &BigUint) -> Result<usize, ByteBlockError> {
        // An offset that does not even fit the native address width cannot be
        // formed from this block's base.
        let idx = offset
            .to_usize()
            .ok_or_else(|| ByteBlockError::AddressOutOfBounds {
                block: self.name.clone(),
                offset: offset.clone(),
            })?;
        if idx >= self.len() {
            return Err(ByteBlockError::IndexOutOfBounds {
                index: offset.clone(),
                length: BigUint::from(self.len()),
            });
        }
        Ok(idx)
    }

    fn is_initialized(&self, idx: usize) -> bool {
        !self.uninitialized.iter().any(|r| r.contains(&idx))
    }
}

impl fmt::Debug for MemoryByteBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryByteBlock")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("len", &self.len())
            .field("uninitialized", &self.uninitialized)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl ByteBlock for MemoryByteBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn base(&self) -> BigUint {
        self.base.clone()
    }

    fn length(&self) -> BigUint {
        BigUint::from(self.len())
    }

    fn has_value(&self, offset: &BigUint) -> bool {
        match self.local_index(offset) {
            Ok(idx) => self.is_initialized(idx),
            Err(_) => false,
        }
    }

    fn get_byte(&self, offset: &BigUint) -> Result<u8, ByteBlockError> {
        let idx = self.local_index(offset)?;
        if !self.is_initialized(idx) {
            return Err(ByteBlockError::Access {
                block: self.name.clone(),
                offset: offset.clone(),
            });
        }
        Ok(self.bytes.borrow()[idx])
    }

    fn set_byte(&self, offset: &BigUint, value: u8) -> Result<(), ByteBlockError> {
        if self.read_only {
            return Err(ByteBlockError::ReadOnly {
                block: self.name.clone(),
            });
        }
        let idx = self.local_index(offset)?;
        if !self.is_initialized(idx) {
            return Err(ByteBlockError::Access {
                block: self.name.clone(),
                offset: offset.clone(),
            });
        }
        self.bytes.borrow_mut()[idx] = value;
        Ok(())
    }

    fn is_changed(&self, offset: &BigUint, len: usize) -> bool {
        let Some(start) = offset.to_usize() else {
            return false;
        };
        let bytes = self.bytes.borrow();
        let baseline = self.baseline.borrow();
        let end = start.saturating_add(len).min(bytes.len());
        (start..end).any(|i| bytes[i] != baseline[i])
    }

    fn is_big_endian(&self) -> bool {
        self.big_endian
    }
}

/// Ordered set of in-memory (or any other) blocks.
#[derive(Debug, Default)]
pub struct MemoryBlockSet {
    blocks: Vec<Rc<dyn ByteBlock>>,
}

impl MemoryBlockSet {
    pub fn new(blocks: Vec<Rc<dyn ByteBlock>>) -> Self {
        Self { blocks }
    }

    /// Build a set that takes ownership of plain memory blocks.
    pub fn from_blocks(blocks: impl IntoIterator<Item = MemoryByteBlock>) -> Self {
        Self {
            blocks: blocks
                .into_iter()
                .map(|b| Rc::new(b) as Rc<dyn ByteBlock>)
                .collect(),
        }
    }

    pub fn push(&mut self, block: Rc<dyn ByteBlock>) {
        self.blocks.push(block);
    }
}

impl ByteBlockSet for MemoryBlockSet {
    fn blocks(&self) -> &[Rc<dyn ByteBlock>] {
        &self.blocks
    }
}
