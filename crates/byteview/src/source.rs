//! Data sources: the program-equivalent objects a provider views.
//!
//! A source exposes its block set and two identities:
//! - `SourceId`, a transient handle that is only valid while the process
//!   runs (used to match undo/redo requests against the viewed source);
//! - `durable_path`, a project-relative path that survives restarts and is
//!   the only identity written into saved state.
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::block::ByteBlockSet;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Transient in-memory identity of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Allocate a fresh id, unique for the lifetime of the process.
    pub fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Something a provider can be attached to.
pub trait ByteSource: fmt::Debug {
    fn id(&self) -> SourceId;

    /// Display name.
    fn name(&self) -> &str;

    /// Project-relative path, or `None` when the source is not stored in the
    /// project (state for such a source cannot be restored and is not saved).
    fn durable_path(&self) -> Option<&str>;

    /// The addressable universe of this source.
    fn block_set(&self) -> Rc<dyn ByteBlockSet>;
}

/// Re-opens sources from their durable path when state is restored.
pub trait SourceResolver {
    /// Returns `None` when `path` no longer resolves to an openable source.
    fn resolve(&self, path: &str) -> Option<Rc<dyn ByteSource>>;
}

/// Source backed by an in-memory block set.
#[derive(Debug)]
pub struct MemorySource {
    id: SourceId,
    name: String,
    path: Option<String>,
    block_set: Rc<dyn ByteBlockSet>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, block_set: Rc<dyn ByteBlockSet>) -> Self {
        Self {
            id: SourceId::next(),
            name: name.into(),
            path: None,
            block_set,
        }
    }

    /// Give the source a durable project path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl ByteSource for MemorySource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn durable_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn block_set(&self) -> Rc<dyn ByteBlockSet> {
        Rc::clone(&self.block_set)
    }
}
