//! Optional host services.
//!
//! Every service is optional. Callers check for presence and skip the call
//! otherwise; a missing service never turns into an error.
use std::rc::Rc;

use crate::selection::ViewerLocation;
use crate::source::{ByteSource, SourceResolver};

/// System clipboard access.
pub trait ClipboardService {
    fn copy(&self, text: &str);
}

/// Host-wide navigation, used to export the connected view's location to the
/// rest of the host.
pub trait GoToService {
    /// Returns true if the host accepted the location.
    fn go_to(&self, source: &dyn ByteSource, location: &ViewerLocation) -> bool;
}

/// The set of services a plugin was built with.
#[derive(Clone, Default)]
pub struct Services {
    pub clipboard: Option<Rc<dyn ClipboardService>>,
    pub go_to: Option<Rc<dyn GoToService>>,
    pub resolver: Option<Rc<dyn SourceResolver>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clipboard(mut self, clipboard: Rc<dyn ClipboardService>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn with_go_to(mut self, go_to: Rc<dyn GoToService>) -> Self {
        self.go_to = Some(go_to);
        self
    }

    pub fn with_resolver(mut self, resolver: Rc<dyn SourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}
