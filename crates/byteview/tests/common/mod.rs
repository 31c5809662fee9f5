#![allow(dead_code)]
//! Shared fixtures and recording test doubles for the integration tests.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use byteview::{
    ByteBlockInfo, ByteBlockSelection, ByteSource, ClipboardService, EventBus, GoToService,
    Highlight, HighlightProvider, MemoryBlockSet, MemoryByteBlock, MemorySource, SourceResolver,
    ViewerEvent, ViewerLocation,
};
use byteview::field::HIGHLIGHT_COLOR;

/// `ram` at 0x1000: bytes 0x00..0x10 with 8..10 uninitialized.
/// `io` at 0x2000: bytes 0xA0..0xA8.
///
/// At 8 bytes per line: rows 0-1 are ram, row 2 separates, row 3 is io.
pub fn two_block_set() -> Rc<MemoryBlockSet> {
    Rc::new(MemoryBlockSet::from_blocks([
        MemoryByteBlock::new("ram", 0x1000u32, (0u8..0x10).collect()).with_uninitialized(8..10),
        MemoryByteBlock::new("io", 0x2000u32, (0xA0u8..0xA8).collect()),
    ]))
}

pub fn source(name: &str, path: Option<&str>) -> Rc<dyn ByteSource> {
    let mut source = MemorySource::new(name, two_block_set());
    if let Some(path) = path {
        source = source.with_path(path);
    }
    Rc::new(source)
}

#[derive(Default)]
pub struct RecordingClipboard {
    pub copied: RefCell<Vec<String>>,
}

impl ClipboardService for RecordingClipboard {
    fn copy(&self, text: &str) {
        self.copied.borrow_mut().push(text.to_string());
    }
}

#[derive(Default)]
pub struct RecordingGoTo {
    pub visited: RefCell<Vec<String>>,
}

impl GoToService for RecordingGoTo {
    fn go_to(&self, source: &dyn ByteSource, location: &ViewerLocation) -> bool {
        self.visited
            .borrow_mut()
            .push(format!("{}:{}", source.name(), location));
        true
    }
}

/// Highlights every text in full and records what it was asked, including
/// whether any of the optional hints were supplied.
#[derive(Default)]
pub struct RecordingHighlights {
    pub seen: RefCell<Vec<(String, bool)>>,
}

impl HighlightProvider for RecordingHighlights {
    fn highlights(
        &self,
        text: &str,
        context: Option<&ByteBlockInfo>,
        selection: Option<&ByteBlockSelection>,
        cursor_offset: Option<usize>,
    ) -> Vec<Highlight> {
        let hinted = context.is_some() || selection.is_some() || cursor_offset.is_some();
        self.seen.borrow_mut().push((text.to_string(), hinted));
        vec![Highlight {
            start: 0,
            end: text.len(),
            color: HIGHLIGHT_COLOR,
        }]
    }
}

/// Resolves sources by their durable path.
#[derive(Default)]
pub struct MapResolver {
    sources: HashMap<String, Rc<dyn ByteSource>>,
}

impl MapResolver {
    pub fn new(sources: impl IntoIterator<Item = Rc<dyn ByteSource>>) -> Self {
        let sources = sources
            .into_iter()
            .filter_map(|s| Some((s.durable_path()?.to_string(), s)))
            .collect();
        Self { sources }
    }
}

impl SourceResolver for MapResolver {
    fn resolve(&self, path: &str) -> Option<Rc<dyn ByteSource>> {
        self.sources.get(path).cloned()
    }
}

/// Collect every event published on `bus`.
pub fn record_events(bus: &EventBus) -> Rc<RefCell<Vec<ViewerEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    seen
}
