#![doc = include_str!("../README.md")]
//! byteview — index-to-field rendering and multi-view state for byte viewers
//!
//! `byteview` renders a possibly gapped address space as a grid of
//! formatted fields and keeps the state of several simultaneous views of
//! it. The crate is organised leaf first:
//!
//! - `block`: `ByteBlock` / `ByteBlockSet`, the addressable byte ranges a
//!   view reads from, with initialization and change tracking.
//! - `index_map`: translation from dense row indices to `(block, offset)`.
//! - `format`: `DataFormatModel` and the built-in hex, ASCII, octal,
//!   decimal and binary models.
//! - `field_factory`: `FieldFactory`, which builds one `Field` per row and
//!   slot and never fails; gaps and unreadable bytes become placeholders.
//! - `provider`: `ByteViewerProvider`, one view instance with its panes,
//!   cursor, selection and persisted state.
//! - `plugin`: `ByteViewerPlugin`, which owns the connected view plus any
//!   number of disconnected views and orchestrates their state.
//!
//! Everything is single-threaded (`Rc`, `RefCell`); hosts serialise calls.
//! Logging goes through the `tracing` facade: installing a subscriber is up
//! to the binary.
//!
//! Example: render the rows of a two-block source
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use byteview::{
//!     ByteSource, ByteViewerPlugin, MemoryBlockSet, MemoryByteBlock, MemorySource, Services,
//! };
//! use num_bigint::BigUint;
//!
//! let blocks = MemoryBlockSet::from_blocks([
//!     MemoryByteBlock::new("ram", 0u32, b"MZ".to_vec()),
//!     MemoryByteBlock::new("io", 0x100u32, vec![0xFF]),
//! ]);
//! let source: Rc<dyn ByteSource> = Rc::new(MemorySource::new("demo", Rc::new(blocks)));
//!
//! let mut plugin = ByteViewerPlugin::standard(Services::new());
//! plugin.set_current_source(Some(source));
//!
//! let provider = plugin.connected_provider();
//! let first = provider.render_row(&BigUint::from(0u32)).unwrap();
//! assert_eq!(first.label.as_deref(), Some("ram:00000000"));
//! assert_eq!(first.panes[0].fields[0].as_ref().unwrap().field.text(), "4d");
//!
//! // Row 1 separates the two blocks.
//! let gap = provider.render_row(&BigUint::from(1u32)).unwrap();
//! assert_eq!(gap.panes[0].fields[0].as_ref().unwrap().field.text(), "..");
//! ```
pub mod block;
pub mod error;
pub mod event;
pub mod field;
pub mod field_factory;
pub mod format;
pub mod index_map;
pub mod plugin;
pub mod provider;
pub mod save_state;
pub mod selection;
pub mod service;
pub mod source;

pub use block::{ByteBlock, ByteBlockSet, MemoryBlockSet, MemoryByteBlock};
pub use error::{ByteBlockError, StateError, ViewerError};
pub use event::{EventBus, SuppressionGuard, ViewerEvent};
pub use field::{
    CHANGED_VALUE_COLOR, Color, DEFAULT_FOREGROUND, Field, FieldHighlighter, FontMetrics,
    Highlight, HighlightProvider, NoHighlights, SEPARATOR_COLOR, TextHighlighter,
};
pub use field_factory::FieldFactory;
pub use format::{DataFormatModel, FORMAT_NAMES, create_model};
pub use index_map::{ByteBlockInfo, IndexMap};
pub use plugin::{ByteViewerPlugin, ProviderContext, ProviderId, TransientState, UndoRedoState};
pub use provider::{
    ByteView, ByteViewerProvider, ProviderLifecycle, RenderedField, RenderedPane, RenderedRow,
    ViewerProvider, ViewerUndoState,
};
pub use save_state::{SaveState, StateValue};
pub use selection::{ByteBlockRange, ByteBlockSelection, NavigationHistory, ViewerLocation};
pub use service::{ClipboardService, GoToService, Services};
pub use source::{ByteSource, MemorySource, SourceId, SourceResolver};
