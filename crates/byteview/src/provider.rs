//! One byte viewer instance: panes, cursor, selection and persisted state.
//!
//! A provider moves through three states:
//!
//! ```text
//! Unattached --attach--> Attached --dispose--> Disposed
//!      ^                    |
//!      +------detach--------+
//! ```
//!
//! While attached it owns one `IndexMap` over the source's block set, shared
//! by every `FieldFactory` of every pane. Anything that changes the row
//! geometry (bytes per line, alignment offset, re-attach) rebuilds the map
//! and rebinds the factories. A disposed provider refuses every operation.
//!
//! The plugin talks to providers only through the `ViewerProvider` trait;
//! `ByteViewerProvider` is the standard implementation.
use std::fmt;
use std::rc::Rc;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use tracing::{debug, warn};

use crate::error::{ByteBlockError, StateError, ViewerError};
use crate::event::{EventBus, ViewerEvent};
use crate::field::{
    CHANGED_VALUE_COLOR, Color, Field, FontMetrics, HighlightProvider, SEPARATOR_COLOR,
    TextHighlighter,
};
use crate::field_factory::FieldFactory;
use crate::format::{DataFormatModel, HexFormatModel, create_model};
use crate::index_map::IndexMap;
use crate::plugin::{ProviderContext, ProviderId};
use crate::save_state::SaveState;
use crate::selection::{ByteBlockSelection, NavigationHistory, ViewerLocation};
use crate::service::ClipboardService;
use crate::source::ByteSource;

pub const DEFAULT_BYTES_PER_LINE: usize = 16;
pub const DEFAULT_VISIBLE_ROWS: usize = 32;

const KEY_BYTES_PER_LINE: &str = "Bytes Per Line";
const KEY_OFFSET: &str = "Offset";
const KEY_VIEW_NAMES: &str = "View Names";
const KEY_HEX_GROUP_SIZE: &str = "Hex Group Size";
const KEY_EDIT_MODE: &str = "Edit Mode";

const KEY_BLOCK_NAME: &str = "Block Name";
const KEY_BLOCK_OFFSET: &str = "Block Offset";
const KEY_COLUMN: &str = "Column";
const KEY_INDEX: &str = "Index";
const KEY_Y_OFFSET: &str = "Y Offset";
const KEY_SELECTION: &str = "Selection";
const KEY_HISTORY: &str = "History";

/// Capabilities the plugin needs from a provider.
///
/// Implementations are built by the factory closure handed to
/// `ByteViewerPlugin::new`, which lets hosts specialise providers without
/// touching the lifecycle code.
pub trait ViewerProvider {
    /// Opaque per-provider snapshot recorded for undo/redo.
    type UndoState: Clone + fmt::Debug;

    fn id(&self) -> ProviderId;

    /// True for the single provider that follows the host's active source.
    fn is_connected(&self) -> bool;

    fn source(&self) -> Option<&Rc<dyn ByteSource>>;

    /// Attach to `source`, or detach with `None`.
    fn set_source(&mut self, source: Option<Rc<dyn ByteSource>>);

    fn set_clipboard(&mut self, clipboard: Option<Rc<dyn ClipboardService>>);

    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;

    /// Release every held reference. The provider must not be used again.
    fn dispose(&mut self);

    fn write_config_state(&self, state: &mut SaveState);

    fn read_config_state(&mut self, state: &SaveState) -> Result<(), ViewerError>;

    fn write_data_state(&self, state: &mut SaveState);

    fn read_data_state(&mut self, state: &SaveState) -> Result<(), ViewerError>;

    /// Restore only the cursor and scroll position from a data state.
    fn restore_location(&mut self, state: &SaveState) -> Result<(), ViewerError>;

    fn current_location(&self) -> Option<&ViewerLocation>;

    fn go_to(&mut self, location: &ViewerLocation) -> Result<bool, ViewerError>;

    fn current_selection(&self) -> ByteBlockSelection;

    fn set_selection(&mut self, selection: ByteBlockSelection);

    /// State worth restoring after an undo or redo of a change to `source`.
    fn undo_redo_state(&self, source: &dyn ByteSource) -> Option<Self::UndoState>;

    fn restore_undo_redo_state(&mut self, source: &dyn ByteSource, state: Self::UndoState);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderLifecycle {
    Unattached,
    Attached,
    Disposed,
}

/// Undo/redo snapshot of a `ByteViewerProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerUndoState {
    pub location: ViewerLocation,
    pub top_index: BigUint,
}

/// One pane of a provider: a format model and one factory per field slot.
pub struct ByteView {
    model: Rc<dyn DataFormatModel>,
    factories: Vec<FieldFactory>,
}

impl ByteView {
    fn new(
        model: Rc<dyn DataFormatModel>,
        bytes_per_line: usize,
        metrics: FontMetrics,
        highlighter: Rc<dyn HighlightProvider>,
        edit_color: Color,
        separator_color: Color,
    ) -> Self {
        let unit = model.unit_byte_size();
        let mut factories = Vec::with_capacity(bytes_per_line / unit);
        let mut x = 0;
        for slot in 0..bytes_per_line / unit {
            let mut factory = FieldFactory::new(
                Rc::clone(&model),
                slot * unit,
                metrics,
                Rc::clone(&highlighter),
            );
            factory.set_start_x(x);
            factory.set_edit_color(edit_color);
            factory.set_separator_color(separator_color);
            x += factory.width() + metrics.char_width;
            factories.push(factory);
        }
        Self { model, factories }
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn model(&self) -> &Rc<dyn DataFormatModel> {
        &self.model
    }

    pub fn factories(&self) -> &[FieldFactory] {
        &self.factories
    }

    /// Pixel width of the pane.
    pub fn width(&self) -> u32 {
        self.factories
            .last()
            .map(|f| f.start_x() + f.width())
            .unwrap_or(0)
    }

    fn set_index_map(&mut self, map: Option<&Rc<IndexMap>>) {
        for factory in &mut self.factories {
            factory.set_index_map(map.cloned());
        }
    }

    fn set_colors(&mut self, edit: Color, separator: Color) {
        for factory in &mut self.factories {
            factory.set_edit_color(edit);
            factory.set_separator_color(separator);
        }
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("model", &self.model.name())
            .field("fields", &self.factories.len())
            .finish()
    }
}

/// A field plus the per-provider decorations the painter needs.
#[derive(Debug, Clone)]
pub struct RenderedField {
    pub field: Field,
    pub selected: bool,
    pub highlighted: bool,
    /// Character column of the cursor when it sits on this field.
    pub cursor: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RenderedPane {
    pub view: String,
    /// One entry per field slot; `None` where nothing is drawn.
    pub fields: Vec<Option<RenderedField>>,
}

#[derive(Debug, Clone)]
pub struct RenderedRow {
    pub index: BigUint,
    /// Address of the first byte in the row; `None` on separator rows.
    pub label: Option<String>,
    pub panes: Vec<RenderedPane>,
}

impl RenderedRow {
    /// Fields of pane `pane` joined by `separator`, absent fields as blanks.
    pub fn pane_text(&self, pane: usize, separator: &str) -> Option<String> {
        let pane = self.panes.get(pane)?;
        let width = pane
            .fields
            .iter()
            .flatten()
            .map(|f| f.field.text().len())
            .max()
            .unwrap_or(0);
        let parts: Vec<String> = pane
            .fields
            .iter()
            .map(|f| match f {
                Some(f) => f.field.text().to_string(),
                None => " ".repeat(width),
            })
            .collect();
        Some(parts.join(separator))
    }
}

/// The standard provider.
pub struct ByteViewerProvider {
    id: ProviderId,
    connected: bool,
    lifecycle: ProviderLifecycle,
    visible: bool,
    events: Rc<EventBus>,
    source: Option<Rc<dyn ByteSource>>,
    index_map: Option<Rc<IndexMap>>,
    views: Vec<ByteView>,
    current_view: usize,
    metrics: FontMetrics,
    bytes_per_line: usize,
    block_offset: usize,
    hex_group_size: usize,
    edit_mode: bool,
    edit_color: Color,
    separator_color: Color,
    text_highlighter: Rc<TextHighlighter>,
    location: Option<ViewerLocation>,
    top_index: BigUint,
    y_offset: i64,
    visible_rows: usize,
    selection: ByteBlockSelection,
    highlight: ByteBlockSelection,
    history: NavigationHistory,
    clipboard: Option<Rc<dyn ClipboardService>>,
}

impl ByteViewerProvider {
    pub fn new(context: ProviderContext) -> Self {
        let mut provider = Self {
            id: context.id,
            connected: context.connected,
            lifecycle: ProviderLifecycle::Unattached,
            visible: true,
            events: context.events,
            source: None,
            index_map: None,
            views: Vec::new(),
            current_view: 0,
            metrics: FontMetrics::default(),
            bytes_per_line: DEFAULT_BYTES_PER_LINE,
            block_offset: 0,
            hex_group_size: 1,
            edit_mode: false,
            edit_color: CHANGED_VALUE_COLOR,
            separator_color: SEPARATOR_COLOR,
            text_highlighter: Rc::new(TextHighlighter::default()),
            location: None,
            top_index: BigUint::zero(),
            y_offset: 0,
            visible_rows: DEFAULT_VISIBLE_ROWS,
            selection: ByteBlockSelection::default(),
            highlight: ByteBlockSelection::default(),
            history: NavigationHistory::default(),
            clipboard: None,
        };
        let hex = provider.build_view(Rc::new(HexFormatModel::new(1)));
        provider.views.push(hex);
        provider
    }

    /// Lay fields out for a different font.
    pub fn with_metrics(mut self, metrics: FontMetrics) -> Self {
        self.metrics = metrics;
        self.rebuild_views();
        self
    }

    pub fn lifecycle(&self) -> ProviderLifecycle {
        self.lifecycle
    }

    pub fn events(&self) -> &Rc<EventBus> {
        &self.events
    }

    pub fn index_map(&self) -> Option<&Rc<IndexMap>> {
        self.index_map.as_ref()
    }

    /// Number of rows, zero while unattached.
    pub fn num_rows(&self) -> BigUint {
        self.index_map
            .as_ref()
            .map(|m| m.num_indexes().clone())
            .unwrap_or_default()
    }

    pub fn views(&self) -> &[ByteView] {
        &self.views
    }

    pub fn view_names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    pub fn block_offset(&self) -> usize {
        self.block_offset
    }

    pub fn hex_group_size(&self) -> usize {
        self.hex_group_size
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn top_index(&self) -> &BigUint {
        &self.top_index
    }

    pub fn set_top_index(&mut self, index: BigUint) {
        self.top_index = index;
    }

    pub fn y_offset(&self) -> i64 {
        self.y_offset
    }

    pub fn set_visible_rows(&mut self, rows: usize) {
        self.visible_rows = rows.max(1);
    }

    pub fn highlight(&self) -> &ByteBlockSelection {
        &self.highlight
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    /// Name of the pane that receives typed edits.
    pub fn current_view(&self) -> Option<&str> {
        self.views.get(self.current_view).map(|v| v.name())
    }

    pub fn set_current_view(&mut self, name: &str) -> bool {
        match self.views.iter().position(|v| v.name() == name) {
            Some(i) => {
                self.current_view = i;
                true
            }
            None => false,
        }
    }

    pub fn attach(&mut self, source: Rc<dyn ByteSource>) {
        if self.lifecycle == ProviderLifecycle::Disposed {
            warn!(provider = %self.id, "attach on disposed provider ignored");
            return;
        }
        // Switching sources drops navigation; a location restored while
        // unattached is kept and checked below.
        let switching = self.source.as_ref().is_some_and(|s| s.id() != source.id());
        debug!(provider = %self.id, source = source.name(), switching, "attach");
        if switching {
            self.reset_navigation();
        }
        self.source = Some(source);
        self.lifecycle = ProviderLifecycle::Attached;
        self.rebuild_index_map();
        let resolves = self
            .location
            .as_ref()
            .is_some_and(|loc| self.row_of(loc).is_some());
        if !resolves {
            self.location = None;
        }
    }

    pub fn detach(&mut self) {
        if self.lifecycle != ProviderLifecycle::Attached {
            return;
        }
        debug!(provider = %self.id, "detach");
        self.source = None;
        self.lifecycle = ProviderLifecycle::Unattached;
        self.reset_navigation();
        self.rebuild_index_map();
    }

    pub fn add_view(&mut self, name: &str) -> Result<(), ViewerError> {
        self.ensure_live()?;
        if self.views.iter().any(|v| v.name() == name) {
            return Ok(());
        }
        let model = create_model(name, self.hex_group_size)?;
        check_bytes_per_line(self.bytes_per_line, [model.unit_byte_size()])?;
        let mut view = self.build_view(model);
        view.set_index_map(self.index_map.as_ref());
        self.views.push(view);
        Ok(())
    }

    /// Returns false when no view has that name.
    pub fn remove_view(&mut self, name: &str) -> bool {
        let Some(i) = self.views.iter().position(|v| v.name() == name) else {
            return false;
        };
        self.views.remove(i);
        if self.current_view >= self.views.len() {
            self.current_view = 0;
        }
        true
    }

    pub fn set_bytes_per_line(&mut self, bytes_per_line: usize) -> Result<(), ViewerError> {
        self.ensure_live()?;
        check_bytes_per_line(
            bytes_per_line,
            self.views.iter().map(|v| v.model().unit_byte_size()),
        )?;
        self.bytes_per_line = bytes_per_line;
        self.block_offset %= bytes_per_line;
        self.rebuild_views();
        self.rebuild_index_map();
        Ok(())
    }

    /// Align row starts to addresses congruent to `offset`.
    pub fn set_block_offset(&mut self, offset: usize) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.block_offset = offset % self.bytes_per_line;
        self.rebuild_index_map();
        Ok(())
    }

    pub fn set_hex_group_size(&mut self, group_size: usize) -> Result<(), ViewerError> {
        self.ensure_live()?;
        if !matches!(group_size, 1 | 2 | 4 | 8) {
            warn!(provider = %self.id, group_size, "rejected hex group size");
            return Err(StateError::InvalidValue {
                key: KEY_HEX_GROUP_SIZE.to_string(),
                value: group_size.to_string(),
            }
            .into());
        }
        check_bytes_per_line(self.bytes_per_line, [group_size])?;
        self.hex_group_size = group_size;
        self.rebuild_views();
        Ok(())
    }

    pub fn set_edit_mode(&mut self, on: bool) {
        self.edit_mode = on;
    }

    pub fn set_edit_color(&mut self, color: Color) {
        self.edit_color = color;
        for view in &mut self.views {
            view.set_colors(self.edit_color, self.separator_color);
        }
    }

    pub fn set_separator_color(&mut self, color: Color) {
        self.separator_color = color;
        for view in &mut self.views {
            view.set_colors(self.edit_color, self.separator_color);
        }
    }

    /// Highlight every occurrence of `text` in rendered fields.
    pub fn set_highlight_text(&mut self, text: Option<&str>) {
        self.text_highlighter.set_pattern(text);
    }

    /// Ranges drawn with the highlight background.
    pub fn set_highlight(&mut self, highlight: ByteBlockSelection) {
        self.highlight = highlight;
    }

    /// Move the cursor to field slot `field_offset` of row `index`.
    pub fn go_to_index(&mut self, index: &BigUint, field_offset: usize) -> Result<bool, ViewerError> {
        self.ensure_live()?;
        let map = self.index_map.clone().ok_or(ViewerError::NotAttached)?;
        let Some(info) = map.get_block_info(index, field_offset) else {
            return Ok(false);
        };
        let location = ViewerLocation::new(info.block().name(), info.offset().clone());
        self.go_to(&location)
    }

    pub fn back(&mut self) -> Result<bool, ViewerError> {
        self.ensure_live()?;
        let Some(target) = self.history.back(self.location.clone()) else {
            return Ok(false);
        };
        Ok(self.show_location(target))
    }

    pub fn forward(&mut self) -> Result<bool, ViewerError> {
        self.ensure_live()?;
        let Some(target) = self.history.forward(self.location.clone()) else {
            return Ok(false);
        };
        Ok(self.show_location(target))
    }

    /// Row index and field slot of the cursor.
    pub fn cursor_position(&self) -> Option<(BigUint, usize)> {
        let loc = self.location.as_ref()?;
        self.index_map.as_ref()?.index_of(&loc.block, &loc.offset)
    }

    /// Type `ch` into `view` at the cursor and advance the cursor.
    ///
    /// Returns `Ok(false)` if there is no cursor or `ch` is not a valid
    /// symbol for the view.
    pub fn edit_at_cursor(&mut self, view: &str, ch: char) -> Result<bool, ViewerError> {
        self.ensure_live()?;
        if !self.edit_mode {
            return Err(ViewerError::NotEditable);
        }
        let map = self.index_map.clone().ok_or(ViewerError::NotAttached)?;
        let view_index = self
            .views
            .iter()
            .position(|v| v.name() == view)
            .ok_or(ViewerError::NotEditable)?;
        let model = Rc::clone(self.views[view_index].model());
        if !model.is_editable() {
            return Err(ViewerError::NotEditable);
        }
        self.current_view = view_index;

        let Some(loc) = self.location.clone() else {
            return Ok(false);
        };
        let Some(block) = map.block_set().block_by_name(&loc.block).cloned() else {
            return Ok(false);
        };
        let Some((row, slot)) = map.index_of(&loc.block, &loc.offset) else {
            return Ok(false);
        };
        let unit = model.unit_byte_size();
        let Some(info) = map.get_block_info(&row, slot / unit * unit) else {
            return Ok(false);
        };
        let unit_start = info.offset().clone();
        let symbols = model.data_unit_symbol_size();
        let column = loc.column.min(symbols - 1);
        if !model.replace_value(block.as_ref(), &unit_start, column, ch)? {
            return Ok(false);
        }

        let next = if column + 1 < symbols {
            let byte = model.byte_offset(block.as_ref(), column + 1);
            ViewerLocation::new(loc.block.as_str(), &unit_start + BigUint::from(byte))
                .with_column(column + 1)
        } else {
            let next_unit = &unit_start + BigUint::from(unit);
            if next_unit >= block.length() {
                return Ok(true);
            }
            let byte = model.byte_offset(block.as_ref(), 0);
            ViewerLocation::new(loc.block.as_str(), next_unit + BigUint::from(byte))
        };
        self.show_location(next);
        Ok(true)
    }

    /// Copy the selected bytes as hex text. Unreadable bytes copy as `??`,
    /// as they render; a range running past its block is cut short. Returns
    /// false when there is no clipboard or nothing is selected.
    pub fn copy_selection(&self) -> Result<bool, ViewerError> {
        self.ensure_live()?;
        let Some(clipboard) = self.clipboard.as_ref() else {
            return Ok(false);
        };
        if self.selection.is_empty() {
            return Ok(false);
        }
        let map = self.index_map.as_ref().ok_or(ViewerError::NotAttached)?;
        let mut parts = Vec::new();
        for range in self.selection.ranges() {
            let Some(block) = map.block_set().block_by_name(&range.block) else {
                continue;
            };
            let mut offset = range.start.clone();
            while offset <= range.end {
                match block.get_byte(&offset) {
                    Ok(byte) => parts.push(format!("{byte:02x}")),
                    Err(ByteBlockError::Access { .. }) => parts.push("??".to_string()),
                    Err(_) => break,
                }
                offset += 1u32;
            }
        }
        clipboard.copy(&parts.join(" "));
        Ok(true)
    }

    /// Render row `index` of every pane. `None` while unattached or past the
    /// last row.
    pub fn render_row(&self, index: &BigUint) -> Option<RenderedRow> {
        let map = self.index_map.as_ref()?;
        if index >= map.num_indexes() {
            return None;
        }
        let cursor = self.cursor_position().filter(|(row, _)| row == index);
        let panes = self
            .views
            .iter()
            .enumerate()
            .map(|(view_index, view)| {
                let unit = view.model().unit_byte_size();
                let fields = view
                    .factories()
                    .iter()
                    .map(|factory| {
                        let field = factory.get_field(index)?;
                        let info = map.get_block_info(index, factory.field_offset());
                        let (selected, highlighted) = match &info {
                            Some(info) => (
                                self.selection.contains(info.block().name(), info.offset()),
                                self.highlight.contains(info.block().name(), info.offset()),
                            ),
                            None => (false, false),
                        };
                        let cursor = match (&cursor, &info) {
                            (Some((_, slot)), Some(info))
                                if slot / unit * unit == factory.field_offset() =>
                            {
                                if view_index == self.current_view {
                                    self.location.as_ref().map(|l| l.column)
                                } else {
                                    Some(factory.column_position(
                                        info.block().as_ref(),
                                        slot - factory.field_offset(),
                                    ))
                                }
                            }
                            _ => None,
                        };
                        Some(RenderedField {
                            field,
                            selected,
                            highlighted,
                            cursor,
                        })
                    })
                    .collect();
                RenderedPane {
                    view: view.name().to_string(),
                    fields,
                }
            })
            .collect();
        Some(RenderedRow {
            index: index.clone(),
            label: map.row_label(index),
            panes,
        })
    }

    fn ensure_live(&self) -> Result<(), ViewerError> {
        if self.lifecycle == ProviderLifecycle::Disposed {
            warn!(provider = %self.id, "operation on disposed provider");
            return Err(ViewerError::Disposed(self.id));
        }
        Ok(())
    }

    fn build_view(&self, model: Rc<dyn DataFormatModel>) -> ByteView {
        ByteView::new(
            model,
            self.bytes_per_line,
            self.metrics,
            Rc::clone(&self.text_highlighter) as Rc<dyn HighlightProvider>,
            self.edit_color,
            self.separator_color,
        )
    }

    fn rebuild_views(&mut self) {
        let models: Vec<Rc<dyn DataFormatModel>> = self
            .views
            .iter()
            .map(|v| match v.name() {
                "Hex" => Rc::new(HexFormatModel::new(self.hex_group_size)) as Rc<dyn DataFormatModel>,
                _ => Rc::clone(v.model()),
            })
            .collect();
        self.views = models.into_iter().map(|m| self.build_view(m)).collect();
        for view in &mut self.views {
            view.set_index_map(self.index_map.as_ref());
        }
    }

    fn rebuild_index_map(&mut self) {
        self.index_map = self.source.as_ref().map(|source| {
            Rc::new(IndexMap::new(
                source.block_set(),
                self.bytes_per_line,
                self.block_offset,
            ))
        });
        for view in &mut self.views {
            view.set_index_map(self.index_map.as_ref());
        }
        if self.top_index >= self.num_rows() {
            self.top_index = BigUint::zero();
        }
        if let Some(row) = self.location.as_ref().and_then(|loc| self.row_of(loc)) {
            self.scroll_to(row);
        }
    }

    fn reset_navigation(&mut self) {
        self.location = None;
        self.top_index = BigUint::zero();
        self.y_offset = 0;
        self.selection = ByteBlockSelection::default();
        self.highlight = ByteBlockSelection::default();
        self.history.clear();
    }

    fn row_of(&self, location: &ViewerLocation) -> Option<BigUint> {
        self.index_map
            .as_ref()?
            .index_of(&location.block, &location.offset)
            .map(|(row, _)| row)
    }

    fn scroll_to(&mut self, row: BigUint) {
        let bottom = &self.top_index + BigUint::from(self.visible_rows);
        if row < self.top_index || row >= bottom {
            self.top_index = row;
        }
    }

    /// Point the column at the byte `location` names in the current view.
    /// Columns already on that byte are kept.
    fn align_column(&self, location: ViewerLocation) -> ViewerLocation {
        let (Some(map), Some(view)) = (self.index_map.as_ref(), self.views.get(self.current_view))
        else {
            return location;
        };
        let model = view.model();
        let unit = model.unit_byte_size();
        let Some(block) = map.block_set().block_by_name(&location.block) else {
            return location;
        };
        let Some((row, slot)) = map.index_of(&location.block, &location.offset) else {
            return location;
        };
        let Some(info) = map.get_block_info(&row, slot / unit * unit) else {
            return location;
        };
        let Some(byte) = (&location.offset - info.offset()).to_usize() else {
            return location;
        };
        if model.byte_offset(block.as_ref(), location.column) == byte {
            return location;
        }
        let column = model.column_position(block.as_ref(), byte);
        location.with_column(column)
    }

    /// Move the cursor without touching history. Returns false when the
    /// location does not resolve.
    fn show_location(&mut self, location: ViewerLocation) -> bool {
        let Some(row) = self.row_of(&location) else {
            return false;
        };
        self.scroll_to(row);
        self.location = Some(location.clone());
        self.events.publish(ViewerEvent::LocationChanged {
            provider: self.id,
            location,
        });
        true
    }
}

impl ViewerProvider for ByteViewerProvider {
    type UndoState = ViewerUndoState;

    fn id(&self) -> ProviderId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn source(&self) -> Option<&Rc<dyn ByteSource>> {
        self.source.as_ref()
    }

    fn set_source(&mut self, source: Option<Rc<dyn ByteSource>>) {
        match source {
            Some(source) => self.attach(source),
            None => self.detach(),
        }
    }

    fn set_clipboard(&mut self, clipboard: Option<Rc<dyn ClipboardService>>) {
        self.clipboard = clipboard;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn dispose(&mut self) {
        if self.lifecycle == ProviderLifecycle::Disposed {
            return;
        }
        debug!(provider = %self.id, "dispose");
        self.source = None;
        self.clipboard = None;
        self.reset_navigation();
        self.rebuild_index_map();
        self.visible = false;
        self.lifecycle = ProviderLifecycle::Disposed;
    }

    fn write_config_state(&self, state: &mut SaveState) {
        state.put_int(KEY_BYTES_PER_LINE, self.bytes_per_line as i64);
        state.put_int(KEY_OFFSET, self.block_offset as i64);
        state.put_strings(KEY_VIEW_NAMES, self.view_names());
        state.put_int(KEY_HEX_GROUP_SIZE, self.hex_group_size as i64);
        state.put_bool(KEY_EDIT_MODE, self.edit_mode);
    }

    fn read_config_state(&mut self, state: &SaveState) -> Result<(), ViewerError> {
        self.ensure_live()?;
        let group = state.get_usize(KEY_HEX_GROUP_SIZE, self.hex_group_size);
        if matches!(group, 1 | 2 | 4 | 8) {
            self.hex_group_size = group;
        } else {
            warn!(provider = %self.id, group, "ignoring hex group size");
        }

        let mut models: Vec<Rc<dyn DataFormatModel>> = Vec::new();
        for name in state.get_strings(KEY_VIEW_NAMES, &["Hex"]) {
            if models.iter().any(|m| m.name() == name) {
                continue;
            }
            match create_model(&name, self.hex_group_size) {
                Ok(model) => models.push(model),
                Err(err) => warn!(provider = %self.id, error = %err, "ignoring view"),
            }
        }
        if models.is_empty() {
            models.push(Rc::new(HexFormatModel::new(self.hex_group_size)));
        }

        let requested = state.get_usize(KEY_BYTES_PER_LINE, DEFAULT_BYTES_PER_LINE);
        self.bytes_per_line =
            match check_bytes_per_line(requested, models.iter().map(|m| m.unit_byte_size())) {
                Ok(()) => requested,
                Err(_) => DEFAULT_BYTES_PER_LINE,
            };
        self.block_offset = state.get_usize(KEY_OFFSET, 0) % self.bytes_per_line;
        self.edit_mode = state.get_bool(KEY_EDIT_MODE, false);

        self.views = models.into_iter().map(|m| self.build_view(m)).collect();
        self.current_view = 0;
        self.rebuild_index_map();
        Ok(())
    }

    fn write_data_state(&self, state: &mut SaveState) {
        if let Some(loc) = &self.location {
            state.put_string(KEY_BLOCK_NAME, loc.block.as_str());
            state.put_big(KEY_BLOCK_OFFSET, &loc.offset);
            state.put_int(KEY_COLUMN, loc.column as i64);
        }
        state.put_big(KEY_INDEX, &self.top_index);
        state.put_int(KEY_Y_OFFSET, self.y_offset);
        state.put_state(KEY_SELECTION, self.selection.to_state());
        state.put_strings(KEY_HISTORY, self.history.to_strings());
    }

    fn read_data_state(&mut self, state: &SaveState) -> Result<(), ViewerError> {
        self.restore_location(state)?;
        if let Some(selection) = state.get_state(KEY_SELECTION) {
            self.set_selection(ByteBlockSelection::from_state(selection));
        }
        self.history.restore(&state.get_strings(KEY_HISTORY, &[]));
        Ok(())
    }

    fn restore_location(&mut self, state: &SaveState) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.y_offset = state.get_int(KEY_Y_OFFSET, 0);
        let top = state.get_big(KEY_INDEX, BigUint::zero());

        let block = state.get_string(KEY_BLOCK_NAME, "");
        let offset = state.try_get_big(KEY_BLOCK_OFFSET);
        if let Some(offset) = offset.filter(|_| !block.is_empty()) {
            let location = ViewerLocation {
                block,
                offset,
                column: state.get_usize(KEY_COLUMN, 0),
            };
            if self.index_map.is_none() {
                // Applied on a later attach if it still resolves.
                self.location = Some(location);
            } else if !self.show_location(location) {
                debug!(provider = %self.id, "saved location no longer resolves");
            }
        }

        if top < self.num_rows() {
            self.top_index = top;
        }
        Ok(())
    }

    fn current_location(&self) -> Option<&ViewerLocation> {
        self.location.as_ref()
    }

    fn go_to(&mut self, location: &ViewerLocation) -> Result<bool, ViewerError> {
        self.ensure_live()?;
        if self.index_map.is_none() {
            return Err(ViewerError::NotAttached);
        }
        if self.row_of(location).is_none() {
            return Ok(false);
        }
        let location = self.align_column(location.clone());
        if let Some(previous) = self.location.clone() {
            if previous != location {
                self.history.push(previous);
            }
        }
        Ok(self.show_location(location))
    }

    fn current_selection(&self) -> ByteBlockSelection {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: ByteBlockSelection) {
        if self.ensure_live().is_err() {
            return;
        }
        self.selection = selection.clone();
        self.events.publish(ViewerEvent::SelectionChanged {
            provider: self.id,
            selection,
        });
    }

    fn undo_redo_state(&self, source: &dyn ByteSource) -> Option<ViewerUndoState> {
        let viewing = self.source.as_ref().is_some_and(|s| s.id() == source.id());
        if !viewing {
            return None;
        }
        Some(ViewerUndoState {
            location: self.location.clone()?,
            top_index: self.top_index.clone(),
        })
    }

    fn restore_undo_redo_state(&mut self, source: &dyn ByteSource, state: ViewerUndoState) {
        let viewing = self.source.as_ref().is_some_and(|s| s.id() == source.id());
        if !viewing || self.ensure_live().is_err() {
            return;
        }
        if self.show_location(state.location) {
            self.top_index = state.top_index;
        }
    }
}

impl fmt::Debug for ByteViewerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteViewerProvider")
            .field("id", &self.id)
            .field("connected", &self.connected)
            .field("lifecycle", &self.lifecycle)
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("views", &self.views)
            .field("bytes_per_line", &self.bytes_per_line)
            .field("location", &self.location)
            .finish()
    }
}

/// `bytes_per_line` must be positive and a multiple of every unit size.
fn check_bytes_per_line(
    bytes_per_line: usize,
    units: impl IntoIterator<Item = usize>,
) -> Result<(), ViewerError> {
    for unit in units {
        if bytes_per_line == 0 || bytes_per_line % unit != 0 {
            warn!(bytes_per_line, unit, "rejected bytes per line");
            return Err(ViewerError::InvalidBytesPerLine {
                bytes_per_line,
                unit,
            });
        }
    }
    if bytes_per_line == 0 {
        return Err(ViewerError::InvalidBytesPerLine {
            bytes_per_line,
            unit: 1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_line_must_fit_every_unit() {
        assert!(check_bytes_per_line(16, [1, 4, 8]).is_ok());
        assert!(matches!(
            check_bytes_per_line(12, [1, 8]),
            Err(ViewerError::InvalidBytesPerLine {
                bytes_per_line: 12,
                unit: 8
            })
        ));
        assert!(check_bytes_per_line(0, []).is_err());
    }

    #[test]
    fn fresh_provider_is_unattached() {
        let provider = ByteViewerProvider::new(ProviderContext {
            id: ProviderId::new(7),
            connected: true,
            events: EventBus::new(),
        });
        assert_eq!(provider.views()[0].factories().len(), 16);
        assert_eq!(provider.views()[0].width(), 16 * 16 + 15 * 8);
        assert!(provider.render_row(&BigUint::zero()).is_none());
        assert_eq!(provider.num_rows(), BigUint::zero());
    }
}
