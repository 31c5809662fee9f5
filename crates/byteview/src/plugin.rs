//! Lifecycle and state orchestration for a connected view plus any number
//! of disconnected views.
//!
//! The plugin owns exactly one connected provider for its whole lifetime.
//! It follows whatever source the host makes current. Disconnected
//! providers are opened on demand, each on its own source with its own
//! `IndexMap`, and are removed and disposed when closed.
//!
//! Persistence comes in three flavours:
//!
//! - config state: the connected provider's preferences only;
//! - data state: the connected provider's navigation plus one
//!   `Provider<i>` record per disconnected provider, keyed by the durable
//!   path of its source;
//! - undo/redo and transient state: in-process snapshots keyed by
//!   `ProviderId`, which is only meaningful within one run.
//!
//! Restores run with event publishing suppressed so rebuilding state does
//! not echo location and selection changes back to the host.
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::ViewerError;
use crate::event::EventBus;
use crate::provider::{ByteViewerProvider, ViewerProvider};
use crate::save_state::SaveState;
use crate::selection::{ByteBlockSelection, ViewerLocation};
use crate::service::Services;
use crate::source::ByteSource;

const KEY_NUM_DISCONNECTED: &str = "Num Disconnected";
const KEY_PROGRAM_PATH: &str = "Program Path";

/// In-process identity of a provider. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

/// What a provider factory is given to build a provider.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub id: ProviderId,
    pub connected: bool,
    pub events: Rc<EventBus>,
}

/// Rollback point for the connected provider: its data state plus its
/// selection at capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientState {
    pub data: SaveState,
    pub selection: ByteBlockSelection,
}

/// Undo/redo snapshot of every provider that had something to record.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRedoState<S> {
    states: BTreeMap<ProviderId, S>,
}

impl<S> UndoRedoState<S> {
    pub fn get(&self, id: ProviderId) -> Option<&S> {
        self.states.get(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.states.keys().copied()
    }
}

type ProviderFactory<P> = Box<dyn FnMut(ProviderContext) -> P>;

pub struct ByteViewerPlugin<P: ViewerProvider> {
    factory: ProviderFactory<P>,
    services: Services,
    events: Rc<EventBus>,
    next_id: u64,
    connected: P,
    disconnected: Vec<P>,
    current_source: Option<Rc<dyn ByteSource>>,
    status: Option<String>,
}

impl ByteViewerPlugin<ByteViewerProvider> {
    /// Plugin over the standard provider.
    pub fn standard(services: Services) -> Self {
        Self::new(ByteViewerProvider::new, services)
    }
}

impl<P: ViewerProvider> ByteViewerPlugin<P> {
    /// Build the plugin and its connected provider. `factory` is called for
    /// every provider the plugin creates, the connected one included.
    pub fn new(factory: impl FnMut(ProviderContext) -> P + 'static, services: Services) -> Self {
        let mut factory: ProviderFactory<P> = Box::new(factory);
        let events = EventBus::new();
        let connected = factory(ProviderContext {
            id: ProviderId::new(1),
            connected: true,
            events: Rc::clone(&events),
        });
        Self {
            factory,
            services,
            events,
            next_id: 2,
            connected,
            disconnected: Vec::new(),
            current_source: None,
            status: None,
        }
    }

    /// Hand the clipboard service (if any) to every provider.
    pub fn init(&mut self) {
        let clipboard = self.services.clipboard.clone();
        self.connected.set_clipboard(clipboard.clone());
        for provider in &mut self.disconnected {
            provider.set_clipboard(clipboard.clone());
        }
    }

    /// Close every provider.
    pub fn dispose(&mut self) {
        self.connected.dispose();
        for mut provider in self.disconnected.drain(..) {
            provider.dispose();
        }
    }

    pub fn events(&self) -> &Rc<EventBus> {
        &self.events
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// True while a restore is in progress.
    pub fn events_disabled(&self) -> bool {
        self.events.is_suppressed()
    }

    pub fn current_source(&self) -> Option<&Rc<dyn ByteSource>> {
        self.current_source.as_ref()
    }

    /// Make `source` current; the connected provider follows it.
    pub fn set_current_source(&mut self, source: Option<Rc<dyn ByteSource>>) {
        self.current_source = source.clone();
        self.connected.set_source(source);
    }

    pub fn connected_provider(&self) -> &P {
        &self.connected
    }

    pub fn connected_provider_mut(&mut self) -> &mut P {
        &mut self.connected
    }

    pub fn disconnected_providers(&self) -> &[P] {
        &self.disconnected
    }

    pub fn provider(&self, id: ProviderId) -> Option<&P> {
        if self.connected.id() == id {
            return Some(&self.connected);
        }
        self.disconnected.iter().find(|p| p.id() == id)
    }

    pub fn provider_mut(&mut self, id: ProviderId) -> Option<&mut P> {
        if self.connected.id() == id {
            return Some(&mut self.connected);
        }
        self.disconnected.iter_mut().find(|p| p.id() == id)
    }

    /// Open a new disconnected provider on `source`.
    pub fn create_new_disconnected_provider(&mut self, source: Rc<dyn ByteSource>) -> ProviderId {
        let mut provider = self.create_provider(false);
        provider.set_source(Some(source));
        let id = provider.id();
        self.add_provider(provider);
        id
    }

    /// Hide the connected provider, or remove and dispose a disconnected one.
    pub fn close_provider(&mut self, id: ProviderId) -> Result<(), ViewerError> {
        if self.connected.id() == id {
            self.connected.set_visible(false);
            return Ok(());
        }
        let pos = self
            .disconnected
            .iter()
            .position(|p| p.id() == id)
            .ok_or(ViewerError::UnknownProvider(id))?;
        let mut provider = self.disconnected.remove(pos);
        debug!(provider = %id, "removing disconnected provider");
        provider.dispose();
        Ok(())
    }

    /// Move provider `id` to `location`. Locations reached by the connected
    /// provider are exported to the host's go-to service unless a restore is
    /// in progress.
    pub fn navigate(&mut self, id: ProviderId, location: &ViewerLocation) -> Result<bool, ViewerError> {
        let provider = self.provider_mut(id).ok_or(ViewerError::UnknownProvider(id))?;
        let moved = provider.go_to(location)?;
        let connected = provider.is_connected();
        if moved && connected && !self.events_disabled() {
            self.export_location(location);
        }
        Ok(moved)
    }

    /// Apply a location that came from elsewhere in the host to the
    /// connected provider, without broadcasting it again.
    pub fn external_location_changed(&mut self, location: &ViewerLocation) -> Result<bool, ViewerError> {
        let _guard = self.events.suppress();
        self.connected.go_to(location)
    }

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn write_config_state(&self, state: &mut SaveState) {
        self.connected.write_config_state(state);
    }

    pub fn read_config_state(&mut self, state: &SaveState) -> Result<(), ViewerError> {
        self.connected.read_config_state(state)
    }

    /// Connected provider state plus one record per disconnected provider.
    ///
    /// `Num Disconnected` is the number of open disconnected providers;
    /// providers whose source has no durable path get no record.
    pub fn write_data_state(&self, state: &mut SaveState) {
        self.connected.write_data_state(state);
        state.put_int(KEY_NUM_DISCONNECTED, self.disconnected.len() as i64);
        let mut i = 0;
        for provider in &self.disconnected {
            let Some(path) = provider.source().and_then(|s| s.durable_path()) else {
                debug!(provider = %provider.id(), "source has no durable path, not saved");
                continue;
            };
            let mut record = SaveState::new();
            record.put_string(KEY_PROGRAM_PATH, path);
            provider.write_config_state(&mut record);
            provider.write_data_state(&mut record);
            state.put_state(format!("Provider{i}"), record);
            i += 1;
        }
    }

    /// Restore the connected provider and re-open disconnected providers
    /// whose source still resolves. Events are suppressed throughout.
    ///
    /// Only a failure of the connected provider is returned; a disconnected
    /// record that fails to restore is logged and skipped.
    pub fn read_data_state(&mut self, state: &SaveState) -> Result<(), ViewerError> {
        let _guard = self.events.suppress();
        self.connected.read_data_state(state)?;

        let count = state.get_usize(KEY_NUM_DISCONNECTED, 0);
        for i in 0..count {
            let Some(record) = state.get_state(&format!("Provider{i}")) else {
                debug!(record = i, "no record");
                continue;
            };
            let path = record.get_string(KEY_PROGRAM_PATH, "");
            if path.is_empty() {
                debug!(record = i, "record has no path");
                continue;
            }
            let source = self
                .services
                .resolver
                .as_ref()
                .and_then(|resolver| resolver.resolve(&path));
            let Some(source) = source else {
                debug!(record = i, path = %path, "path does not resolve, skipped");
                continue;
            };
            let mut provider = self.create_provider(false);
            provider.set_source(Some(source));
            let restored = provider
                .read_config_state(record)
                .and_then(|()| provider.read_data_state(record));
            if let Err(e) = restored {
                warn!(record = i, path = %path, error = %e, "record not restored");
                provider.dispose();
                continue;
            }
            self.add_provider(provider);
        }
        Ok(())
    }

    /// Snapshot of every provider viewing `source` that has state to record.
    /// `None` when there is nothing to record.
    pub fn undo_redo_state(&self, source: &dyn ByteSource) -> Option<UndoRedoState<P::UndoState>> {
        let states: BTreeMap<ProviderId, P::UndoState> = std::iter::once(&self.connected)
            .chain(self.disconnected.iter())
            .filter_map(|p| Some((p.id(), p.undo_redo_state(source)?)))
            .collect();
        if states.is_empty() {
            return None;
        }
        Some(UndoRedoState { states })
    }

    /// Hand each live provider its own entry; providers without one are
    /// left untouched.
    pub fn restore_undo_redo_state(&mut self, source: &dyn ByteSource, state: &UndoRedoState<P::UndoState>) {
        for provider in std::iter::once(&mut self.connected).chain(self.disconnected.iter_mut()) {
            if let Some(entry) = state.get(provider.id()) {
                provider.restore_undo_redo_state(source, entry.clone());
            }
        }
    }

    pub fn transient_state(&self) -> TransientState {
        let mut data = SaveState::new();
        self.connected.write_data_state(&mut data);
        TransientState {
            data,
            selection: self.connected.current_selection(),
        }
    }

    pub fn restore_transient_state(&mut self, state: &TransientState) -> Result<(), ViewerError> {
        let _guard = self.events.suppress();
        self.connected.restore_location(&state.data)?;
        self.connected.set_selection(state.selection.clone());
        Ok(())
    }

    fn create_provider(&mut self, connected: bool) -> P {
        let id = ProviderId::new(self.next_id);
        self.next_id += 1;
        debug!(provider = %id, connected, "creating provider");
        (self.factory)(ProviderContext {
            id,
            connected,
            events: Rc::clone(&self.events),
        })
    }

    fn add_provider(&mut self, mut provider: P) {
        provider.set_clipboard(self.services.clipboard.clone());
        self.disconnected.push(provider);
    }

    fn export_location(&self, location: &ViewerLocation) {
        let (Some(go_to), Some(source)) = (self.services.go_to.as_ref(), self.connected.source()) else {
            return;
        };
        go_to.go_to(source.as_ref(), location);
    }
}

impl<P: ViewerProvider + fmt::Debug> fmt::Debug for ByteViewerPlugin<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteViewerPlugin")
            .field("connected", &self.connected)
            .field("disconnected", &self.disconnected)
            .field("events", &self.events)
            .field("status", &self.status)
            .finish()
    }
}
