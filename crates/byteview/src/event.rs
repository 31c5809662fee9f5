//! Viewer notifications and the scoped suppression used during restores.
//!
//! Providers publish location and selection changes on a shared `EventBus`.
//! While state is being rebuilt (restoring saved or transient state, or
//! applying a location that came from outside) those notifications would
//! echo back into the host, so the plugin holds a `SuppressionGuard` for the
//! duration: publishing is a no-op until the guard is dropped, on every exit
//! path including `?` returns.
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::plugin::ProviderId;
use crate::selection::{ByteBlockSelection, ViewerLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    LocationChanged {
        provider: ProviderId,
        location: ViewerLocation,
    },
    SelectionChanged {
        provider: ProviderId,
        selection: ByteBlockSelection,
    },
}

type Listener = Box<dyn Fn(&ViewerEvent)>;

/// Single-threaded broadcast of `ViewerEvent`s.
///
/// Listeners must not subscribe from inside a callback.
#[derive(Default)]
pub struct EventBus {
    suppressed: Cell<bool>,
    listeners: RefCell<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn subscribe(&self, listener: impl Fn(&ViewerEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Deliver `event` to every listener. Returns false (and delivers
    /// nothing) while suppressed.
    pub fn publish(&self, event: ViewerEvent) -> bool {
        if self.suppressed.get() {
            return false;
        }
        for listener in self.listeners.borrow().iter() {
            listener(&event);
        }
        true
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.get()
    }

    /// Suppress publishing until the returned guard is dropped. Guards nest:
    /// dropping an inner guard leaves the outer suppression in place.
    pub fn suppress(self: &Rc<Self>) -> SuppressionGuard {
        let previous = self.suppressed.replace(true);
        SuppressionGuard {
            bus: Rc::clone(self),
            previous,
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("suppressed", &self.suppressed.get())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

#[must_use = "suppression ends as soon as the guard is dropped"]
pub struct SuppressionGuard {
    bus: Rc<EventBus>,
    previous: bool,
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        self.bus.suppressed.set(self.previous);
    }
}
