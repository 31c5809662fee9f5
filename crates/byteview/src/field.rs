//! Renderable fields and the highlight plumbing attached to them.
//!
//! A `Field` is what the factory hands to a painter: a positioned, sized
//! piece of text with a foreground colour. Fields are built fresh for every
//! paint and never mutated afterwards.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigUint;

use crate::index_map::ByteBlockInfo;
use crate::selection::ByteBlockSelection;

/// RGB colour, independent of any GUI toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Foreground of ordinary values.
pub const DEFAULT_FOREGROUND: Color = Color::rgb(0, 0, 0);
/// Foreground of values that differ from the edit baseline.
pub const CHANGED_VALUE_COLOR: Color = Color::rgb(255, 0, 0);
/// Foreground of separator placeholders between blocks.
pub const SEPARATOR_COLOR: Color = Color::rgb(0, 0, 128);
/// Default background for text highlights.
pub const HIGHLIGHT_COLOR: Color = Color::rgb(255, 255, 128);

/// Pixel metrics of the fixed-width font fields are laid out with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    /// Advance of one character (the widest glyph for proportional fonts).
    pub char_width: u32,
    pub height: u32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            char_width: 8,
            height: 16,
        }
    }
}

/// A coloured span `start..end` of a field's text, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub color: Color,
}

/// Host supplied source of text highlights.
pub trait HighlightProvider {
    /// Highlights for `text`. `context`, `selection` and `cursor_offset` are
    /// optional hints; implementations must cope with all of them absent.
    fn highlights(
        &self,
        text: &str,
        context: Option<&ByteBlockInfo>,
        selection: Option<&ByteBlockSelection>,
        cursor_offset: Option<usize>,
    ) -> Vec<Highlight>;
}

/// Provider that never highlights anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHighlights;

impl HighlightProvider for NoHighlights {
    fn highlights(
        &self,
        _text: &str,
        _context: Option<&ByteBlockInfo>,
        _selection: Option<&ByteBlockSelection>,
        _cursor_offset: Option<usize>,
    ) -> Vec<Highlight> {
        Vec::new()
    }
}

/// Highlights every occurrence of a search string (case-insensitive).
#[derive(Debug)]
pub struct TextHighlighter {
    pattern: RefCell<Option<String>>,
    color: Color,
}

impl TextHighlighter {
    pub fn new(color: Color) -> Self {
        Self {
            pattern: RefCell::new(None),
            color,
        }
    }

    /// Replace the search string; `None` or an empty string clears it.
    pub fn set_pattern(&self, pattern: Option<&str>) {
        *self.pattern.borrow_mut() = pattern
            .filter(|p| !p.is_empty())
            .map(|p| p.to_ascii_lowercase());
    }

    pub fn pattern(&self) -> Option<String> {
        self.pattern.borrow().clone()
    }
}

impl Default for TextHighlighter {
    fn default() -> Self {
        Self::new(HIGHLIGHT_COLOR)
    }
}

impl HighlightProvider for TextHighlighter {
    fn highlights(
        &self,
        text: &str,
        _context: Option<&ByteBlockInfo>,
        _selection: Option<&ByteBlockSelection>,
        _cursor_offset: Option<usize>,
    ) -> Vec<Highlight> {
        let pattern = self.pattern.borrow();
        let Some(pattern) = pattern.as_deref() else {
            return Vec::new();
        };
        let haystack = text.to_ascii_lowercase();
        haystack
            .match_indices(pattern)
            .map(|(start, m)| Highlight {
                start,
                end: start + m.len(),
                color: self.color,
            })
            .collect()
    }
}

/// Per-field adapter: fields ask it for highlights of their own text only,
/// without any context, selection or cursor.
#[derive(Clone)]
pub struct FieldHighlighter {
    provider: Rc<dyn HighlightProvider>,
}

impl FieldHighlighter {
    pub fn new(provider: Rc<dyn HighlightProvider>) -> Self {
        Self { provider }
    }

    pub fn highlights(&self, text: &str) -> Vec<Highlight> {
        self.provider.highlights(text, None, None, None)
    }
}

impl fmt::Debug for FieldHighlighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldHighlighter")
    }
}

/// One rendered unit of a row.
#[derive(Debug, Clone)]
pub struct Field {
    start_x: u32,
    width: u32,
    text: String,
    color: Color,
    index: BigUint,
    field_offset: usize,
    highlighter: FieldHighlighter,
}

impl Field {
    pub(crate) fn new(
        text: String,
        start_x: u32,
        width: u32,
        field_offset: usize,
        index: BigUint,
        highlighter: FieldHighlighter,
    ) -> Self {
        Self {
            start_x,
            width,
            text,
            color: DEFAULT_FOREGROUND,
            index,
            field_offset,
            highlighter,
        }
    }

    pub(crate) fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn start_x(&self) -> u32 {
        self.start_x
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Row this field was built for.
    pub fn index(&self) -> &BigUint {
        &self.index
    }

    pub fn field_offset(&self) -> usize {
        self.field_offset
    }

    pub fn highlights(&self) -> Vec<Highlight> {
        self.highlighter.highlights(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_highlighter_is_case_insensitive() {
        let h = TextHighlighter::default();
        assert!(h.highlights("4d5a", None, None, None).is_empty());

        h.set_pattern(Some("5A"));
        let found = h.highlights("4d5a5a", None, None, None);
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].start, found[0].end), (2, 4));
        assert_eq!(found[1].color, HIGHLIGHT_COLOR);

        h.set_pattern(Some(""));
        assert_eq!(h.pattern(), None);
    }
}
