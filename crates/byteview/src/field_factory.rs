//! Per-column field construction: the rendering core of the viewer.
//!
//! One `FieldFactory` exists for every field slot of every view. Given a row
//! index it resolves the slot through the `IndexMap`, formats the unit with
//! the view's `DataFormatModel` and colours it according to the block set's
//! change tracking.
//!
//! `get_field` is total. Every failure becomes a placeholder made of one
//! glyph repeated `data_unit_symbol_size` times:
//!
//! | situation                                   | text   | colour           |
//! |---------------------------------------------|--------|------------------|
//! | no index map bound                          | none   |                  |
//! | separator row                               | `....` | separator colour |
//! | index outside every block                   | none   |                  |
//! | uninitialized value / access failure        | `????` | default          |
//! | address or index out of bounds              | `....` | default          |
//! | formatted, unit changed against baseline    | value  | edit colour      |
//! | formatted                                   | value  | default          |
use std::fmt;
use std::rc::Rc;

use num_bigint::BigUint;
use tracing::trace;

use crate::block::{ByteBlock, ByteBlockSet};
use crate::error::ByteBlockError;
use crate::field::{
    CHANGED_VALUE_COLOR, Color, Field, FieldHighlighter, FontMetrics, HighlightProvider,
    SEPARATOR_COLOR,
};
use crate::format::DataFormatModel;
use crate::index_map::IndexMap;

const NO_VALUE_GLYPH: char = '.';
const READ_ERROR_GLYPH: char = '?';

pub struct FieldFactory {
    model: Rc<dyn DataFormatModel>,
    index_map: Option<Rc<IndexMap>>,
    block_set: Option<Rc<dyn ByteBlockSet>>,
    metrics: FontMetrics,
    field_offset: usize,
    width: u32,
    start_x: u32,
    no_value: String,
    read_error: String,
    edit_color: Color,
    separator_color: Color,
    unit_byte_size: usize,
    highlighter: FieldHighlighter,
}

impl FieldFactory {
    /// Factory for the slot at `field_offset` (in bytes from the start of
    /// the row) of a view formatted by `model`.
    pub fn new(
        model: Rc<dyn DataFormatModel>,
        field_offset: usize,
        metrics: FontMetrics,
        highlight_provider: Rc<dyn HighlightProvider>,
    ) -> Self {
        let width = metrics.char_width * model.data_unit_symbol_size() as u32;
        let unit_byte_size = model.unit_byte_size();
        Self {
            model,
            index_map: None,
            block_set: None,
            metrics,
            field_offset,
            width,
            start_x: 0,
            no_value: String::new(),
            read_error: String::new(),
            edit_color: CHANGED_VALUE_COLOR,
            separator_color: SEPARATOR_COLOR,
            unit_byte_size,
            highlighter: FieldHighlighter::new(highlight_provider),
        }
    }

    pub fn set_start_x(&mut self, x: u32) {
        self.start_x = x;
    }

    pub fn start_x(&self) -> u32 {
        self.start_x
    }

    /// Pixel width of every field this factory builds.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn field_offset(&self) -> usize {
        self.field_offset
    }

    pub fn model(&self) -> &Rc<dyn DataFormatModel> {
        &self.model
    }

    /// Bind (or with `None`, unbind) the index map. Placeholder strings are
    /// regenerated for the current model's symbol width.
    pub fn set_index_map(&mut self, index_map: Option<Rc<IndexMap>>) {
        match &index_map {
            Some(map) => {
                self.no_value = self.placeholder(NO_VALUE_GLYPH);
                self.read_error = self.placeholder(READ_ERROR_GLYPH);
                self.block_set = Some(Rc::clone(map.block_set()));
            }
            None => self.block_set = None,
        }
        self.index_map = index_map;
    }

    /// Character column within the field where byte `byte_offset` of the
    /// unit is printed.
    pub fn column_position(&self, block: &dyn ByteBlock, byte_offset: usize) -> usize {
        self.model.column_position(block, byte_offset)
    }

    pub fn set_edit_color(&mut self, color: Color) {
        self.edit_color = color;
    }

    pub fn set_separator_color(&mut self, color: Color) {
        self.separator_color = color;
    }

    /// Build the field for row `index`, or `None` when nothing is drawn there.
    pub fn get_field(&self, index: &BigUint) -> Option<Field> {
        let map = self.index_map.as_ref()?;

        let Some(info) = map.get_block_info(index, self.field_offset) else {
            if map.show_separator(index) {
                trace!(%index, field_offset = self.field_offset, "separator placeholder");
                return Some(
                    self.text_field(self.no_value.clone(), index)
                        .with_color(self.separator_color),
                );
            }
            return None;
        };

        let block = info.block();
        let offset = info.offset();
        if !block.has_value(offset) {
            // Same outcome as an access failure, without paying for the read.
            trace!(%index, field_offset = self.field_offset, "uninitialized value");
            return Some(self.text_field(self.read_error.clone(), index));
        }

        match self.model.data_representation(block.as_ref(), offset) {
            Ok(text) => {
                let field = self.text_field(text, index);
                let changed = self
                    .block_set
                    .as_ref()
                    .is_some_and(|set| set.is_changed(block.as_ref(), offset, self.unit_byte_size));
                Some(if changed {
                    field.with_color(self.edit_color)
                } else {
                    field
                })
            }
            Err(err) => {
                trace!(%index, field_offset = self.field_offset, error = %err, "read failed");
                let text = match err {
                    ByteBlockError::AddressOutOfBounds { .. }
                    | ByteBlockError::IndexOutOfBounds { .. } => self.no_value.clone(),
                    ByteBlockError::Access { .. } | ByteBlockError::ReadOnly { .. } => {
                        self.read_error.clone()
                    }
                };
                Some(self.text_field(text, index))
            }
        }
    }

    fn placeholder(&self, glyph: char) -> String {
        std::iter::repeat_n(glyph, self.model.data_unit_symbol_size()).collect()
    }

    fn text_field(&self, text: String, index: &BigUint) -> Field {
        Field::new(
            text,
            self.start_x,
            self.width,
            self.field_offset,
            index.clone(),
            self.highlighter.clone(),
        )
    }
}

impl fmt::Debug for FieldFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldFactory")
            .field("model", &self.model.name())
            .field("field_offset", &self.field_offset)
            .field("start_x", &self.start_x)
            .field("width", &self.width)
            .field("bound", &self.index_map.is_some())
            .finish()
    }
}
