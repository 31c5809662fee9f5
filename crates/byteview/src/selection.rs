//! Cursor locations, byte selections and navigation history.
//!
//! Everything here names blocks by their durable name rather than by
//! reference so it can be persisted and compared across reloads.
use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;

use crate::error::StateError;
use crate::save_state::SaveState;

const KEY_COUNT: &str = "Count";
const KEY_BLOCK: &str = "Block";
const KEY_START: &str = "Start";
const KEY_END: &str = "End";

/// Cursor position: a byte of a block plus the character column inside the
/// unit that byte belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewerLocation {
    pub block: String,
    pub offset: BigUint,
    pub column: usize,
}

impl ViewerLocation {
    pub fn new(block: impl Into<String>, offset: impl Into<BigUint>) -> Self {
        Self {
            block: block.into(),
            offset: offset.into(),
            column: 0,
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }
}

/// `block@offset`, offset in hexadecimal. The column is not part of the text.
impl fmt::Display for ViewerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.block, self.offset)
    }
}

impl FromStr for ViewerLocation {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StateError::InvalidValue {
            key: "location".to_string(),
            value: s.to_string(),
        };
        let (block, offset) = s.rsplit_once('@').ok_or_else(invalid)?;
        if block.is_empty() {
            return Err(invalid());
        }
        let offset = BigUint::parse_bytes(offset.as_bytes(), 16).ok_or_else(invalid)?;
        Ok(Self::new(block, offset))
    }
}

/// Inclusive byte range `start..=end` of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBlockRange {
    pub block: String,
    pub start: BigUint,
    pub end: BigUint,
}

impl ByteBlockRange {
    pub fn new(block: impl Into<String>, start: impl Into<BigUint>, end: impl Into<BigUint>) -> Self {
        Self {
            block: block.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn contains(&self, block: &str, offset: &BigUint) -> bool {
        self.block == block && &self.start <= offset && offset <= &self.end
    }
}

/// Ordered list of selected ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBlockSelection {
    ranges: Vec<ByteBlockRange>,
}

impl ByteBlockSelection {
    pub fn new(ranges: Vec<ByteBlockRange>) -> Self {
        Self { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[ByteBlockRange] {
        &self.ranges
    }

    pub fn add(&mut self, range: ByteBlockRange) {
        self.ranges.push(range);
    }

    pub fn contains(&self, block: &str, offset: &BigUint) -> bool {
        self.ranges.iter().any(|r| r.contains(block, offset))
    }

    /// Nested bag with `Count` and one `Range<i>` bag per range.
    pub fn to_state(&self) -> SaveState {
        let mut state = SaveState::new();
        state.put_int(KEY_COUNT, self.ranges.len() as i64);
        for (i, range) in self.ranges.iter().enumerate() {
            let mut r = SaveState::new();
            r.put_string(KEY_BLOCK, range.block.as_str());
            r.put_big(KEY_START, &range.start);
            r.put_big(KEY_END, &range.end);
            state.put_state(format!("Range{i}"), r);
        }
        state
    }

    /// Inverse of `to_state`. Incomplete range entries are dropped.
    pub fn from_state(state: &SaveState) -> Self {
        let count = state.get_usize(KEY_COUNT, 0);
        let ranges = (0..count)
            .filter_map(|i| state.get_state(&format!("Range{i}")))
            .filter_map(|r| {
                let block = r.get_string(KEY_BLOCK, "");
                if block.is_empty() {
                    return None;
                }
                Some(ByteBlockRange {
                    block,
                    start: r.try_get_big(KEY_START)?,
                    end: r.try_get_big(KEY_END)?,
                })
            })
            .collect();
        Self { ranges }
    }
}

/// Back/forward stacks of visited locations.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    back: Vec<ViewerLocation>,
    forward: Vec<ViewerLocation>,
    limit: usize,
}

impl NavigationHistory {
    pub const DEFAULT_LIMIT: usize = 30;

    pub fn new(limit: usize) -> Self {
        Self {
            back: Vec::new(),
            forward: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record `previous` as the place we just left. Clears the forward stack.
    pub fn push(&mut self, previous: ViewerLocation) {
        if self.back.last() != Some(&previous) {
            self.back.push(previous);
            if self.back.len() > self.limit {
                self.back.remove(0);
            }
        }
        self.forward.clear();
    }

    /// Step back from `current`, returning the location to show.
    pub fn back(&mut self, current: Option<ViewerLocation>) -> Option<ViewerLocation> {
        let target = self.back.pop()?;
        if let Some(current) = current {
            self.forward.push(current);
        }
        Some(target)
    }

    pub fn forward(&mut self, current: Option<ViewerLocation>) -> Option<ViewerLocation> {
        let target = self.forward.pop()?;
        if let Some(current) = current {
            self.back.push(current);
        }
        Some(target)
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
    }

    /// Back stack as `block@offset` strings, oldest first.
    pub fn to_strings(&self) -> Vec<String> {
        self.back.iter().map(ToString::to_string).collect()
    }

    /// Rebuild the back stack; unparsable entries are skipped.
    pub fn restore(&mut self, entries: &[String]) {
        self.clear();
        self.back = entries.iter().filter_map(|e| e.parse().ok()).collect();
        let excess = self.back.len().saturating_sub(self.limit);
        self.back.drain(..excess);
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}
