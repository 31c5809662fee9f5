mod common;

use std::cell::RefCell;
use std::rc::Rc;

use byteview::{
    ByteBlockRange, ByteBlockSelection, ByteSource, ByteViewerPlugin, ClipboardService, EventBus,
    ProviderContext, ProviderId, ProviderLifecycle, SaveState, Services, ViewerError,
    ViewerEvent, ViewerLocation, ViewerProvider,
};

use common::{MapResolver, RecordingClipboard, RecordingGoTo};

fn loc(block: &str, offset: u32) -> ViewerLocation {
    ViewerLocation::new(block, offset)
}

/// Provider whose restore fails. By default every data restore publishes an
/// event and then fails; `failing_for` narrows failures to one source path.
#[derive(Debug)]
struct FailingProvider {
    id: ProviderId,
    connected: bool,
    events: Rc<EventBus>,
    source: Option<Rc<dyn ByteSource>>,
    fails_for: Option<&'static str>,
    disposed: Rc<RefCell<Vec<ProviderId>>>,
}

impl FailingProvider {
    fn new(context: ProviderContext) -> Self {
        Self {
            id: context.id,
            connected: context.connected,
            events: context.events,
            source: None,
            fails_for: None,
            disposed: Rc::default(),
        }
    }

    fn failing_for(
        context: ProviderContext,
        path: &'static str,
        disposed: Rc<RefCell<Vec<ProviderId>>>,
    ) -> Self {
        Self {
            fails_for: Some(path),
            disposed,
            ..Self::new(context)
        }
    }

    fn fails(&self) -> bool {
        match self.fails_for {
            None => true,
            Some(path) => self.source.as_ref().and_then(|s| s.durable_path()) == Some(path),
        }
    }
}

impl ViewerProvider for FailingProvider {
    type UndoState = ();

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
        self.source = source;
    }

    fn set_clipboard(&mut self, _clipboard: Option<Rc<dyn ClipboardService>>) {}

    fn set_visible(&mut self, _visible: bool) {}

    fn is_visible(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed.borrow_mut().push(self.id);
    }

    fn write_config_state(&self, _state: &mut SaveState) {}

    fn read_config_state(&mut self, _state: &SaveState) -> Result<(), ViewerError> {
        if self.fails_for.is_some() && self.fails() {
            return Err(ViewerError::NotAttached);
        }
        Ok(())
    }

    fn write_data_state(&self, _state: &mut SaveState) {}

    fn read_data_state(&mut self, _state: &SaveState) -> Result<(), ViewerError> {
        if !self.fails() {
            return Ok(());
        }
        self.events.publish(ViewerEvent::LocationChanged {
            provider: self.id,
            location: loc("ram", 0),
        });
        Err(ViewerError::NotAttached)
    }

    fn restore_location(&mut self, _state: &SaveState) -> Result<(), ViewerError> {
        Ok(())
    }

    fn current_location(&self) -> Option<&ViewerLocation> {
        None
    }

    fn go_to(&mut self, _location: &ViewerLocation) -> Result<bool, ViewerError> {
        Ok(false)
    }

    fn current_selection(&self) -> ByteBlockSelection {
        ByteBlockSelection::default()
    }

    fn set_selection(&mut self, _selection: ByteBlockSelection) {}

    fn undo_redo_state(&self, _source: &dyn ByteSource) -> Option<()> {
        None
    }

    fn restore_undo_redo_state(&mut self, _source: &dyn ByteSource, _state: ()) {}
}

#[test]
fn test_connected_provider_follows_current_source() {
    let first = common::source("first", None);
    let second = common::source("second", None);
    let mut plugin = ByteViewerPlugin::standard(Services::new());
    assert_eq!(plugin.connected_provider().id(), ProviderId::new(1));
    assert!(plugin.connected_provider().is_connected());

    plugin.set_current_source(Some(Rc::clone(&first)));
    assert_eq!(plugin.connected_provider().lifecycle(), ProviderLifecycle::Attached);
    plugin.navigate(ProviderId::new(1), &loc("ram", 4)).unwrap();

    plugin.set_current_source(Some(Rc::clone(&second)));
    let provider = plugin.connected_provider();
    assert_eq!(provider.source().unwrap().id(), second.id());
    // A different source starts with fresh navigation.
    assert_eq!(provider.current_location(), None);

    plugin.set_current_source(None);
    assert!(plugin.current_source().is_none());
    assert_eq!(plugin.connected_provider().lifecycle(), ProviderLifecycle::Unattached);
}

#[test]
fn test_disconnected_providers_round_trip() {
    let a = common::source("a", Some("/a"));
    let b = common::source("b", Some("/b"));
    let scratch = common::source("scratch", None);
    let gone = common::source("gone", Some("/gone"));

    let mut plugin = ByteViewerPlugin::standard(Services::new());
    let ids: Vec<ProviderId> = [&a, &b, &scratch, &gone]
        .into_iter()
        .map(|s| plugin.create_new_disconnected_provider(Rc::clone(s)))
        .collect();
    assert_eq!(ids, (2..6).map(ProviderId::new).collect::<Vec<_>>());

    plugin
        .provider_mut(ids[1])
        .unwrap()
        .set_bytes_per_line(8)
        .unwrap();
    assert!(plugin.navigate(ids[1], &loc("io", 4)).unwrap());

    let mut state = SaveState::new();
    plugin.write_data_state(&mut state);
    assert_eq!(state.get_int("Num Disconnected", 0), 4);
    let paths: Vec<String> = (0..4)
        .filter_map(|i| state.get_state(&format!("Provider{i}")))
        .map(|record| record.get_string("Program Path", ""))
        .collect();
    assert_eq!(paths, vec!["/a", "/b", "/gone"]);

    let resolver = Rc::new(MapResolver::new([Rc::clone(&a), Rc::clone(&b)]));
    let mut restored = ByteViewerPlugin::standard(Services::new().with_resolver(resolver));
    restored.read_data_state(&state).unwrap();

    let providers = restored.disconnected_providers();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].source().unwrap().id(), a.id());
    assert_eq!(providers[1].source().unwrap().id(), b.id());
    assert_eq!(providers[1].bytes_per_line(), 8);
    assert_eq!(providers[1].current_location(), Some(&loc("io", 4)));
    assert!(!providers[0].is_connected());
}

#[test]
fn test_read_data_state_is_silent() {
    let source = common::source("demo", Some("/demo"));
    let mut original = ByteViewerPlugin::standard(Services::new());
    original.set_current_source(Some(Rc::clone(&source)));
    original.navigate(ProviderId::new(1), &loc("io", 2)).unwrap();
    original
        .connected_provider_mut()
        .set_selection(ByteBlockSelection::new(vec![ByteBlockRange::new("ram", 0u32, 1u32)]));
    let mut state = SaveState::new();
    original.write_data_state(&mut state);

    let mut restored = ByteViewerPlugin::standard(Services::new());
    restored.set_current_source(Some(source));
    let seen = common::record_events(restored.events());
    restored.read_data_state(&state).unwrap();

    assert!(seen.borrow().is_empty());
    assert!(!restored.events_disabled());
    assert_eq!(restored.connected_provider().current_location(), Some(&loc("io", 2)));
    assert_eq!(
        restored.connected_provider().current_selection(),
        original.connected_provider().current_selection()
    );
}

#[test]
fn test_failed_restore_lifts_suppression() {
    let mut plugin = ByteViewerPlugin::new(FailingProvider::new, Services::new());
    let seen = common::record_events(plugin.events());

    match plugin.read_data_state(&SaveState::new()) {
        Err(ViewerError::NotAttached) => {}
        other => panic!("expected the provider error, got {:?}", other),
    }
    assert!(seen.borrow().is_empty());
    assert!(!plugin.events_disabled());

    plugin.events().publish(ViewerEvent::SelectionChanged {
        provider: ProviderId::new(1),
        selection: ByteBlockSelection::default(),
    });
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_failed_disconnected_record_is_skipped() {
    let bad = common::source("bad", Some("/bad"));
    let good = common::source("good", Some("/good"));

    let mut state = SaveState::new();
    state.put_int("Num Disconnected", 2);
    for (i, path) in ["/bad", "/good"].into_iter().enumerate() {
        let mut record = SaveState::new();
        record.put_string("Program Path", path);
        state.put_state(format!("Provider{i}"), record);
    }

    let disposed = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&disposed);
    let resolver = Rc::new(MapResolver::new([Rc::clone(&bad), Rc::clone(&good)]));
    let mut plugin = ByteViewerPlugin::new(
        move |context| FailingProvider::failing_for(context, "/bad", Rc::clone(&log)),
        Services::new().with_resolver(resolver),
    );
    let seen = common::record_events(plugin.events());

    plugin.read_data_state(&state).unwrap();

    let providers = plugin.disconnected_providers();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].source().unwrap().id(), good.id());
    assert_eq!(*disposed.borrow(), vec![ProviderId::new(2)]);
    assert!(seen.borrow().is_empty());
    assert!(!plugin.events_disabled());
}

#[test]
fn test_transient_state_round_trip() {
    let source = common::source("demo", None);
    let mut plugin = ByteViewerPlugin::standard(Services::new());
    plugin.set_current_source(Some(source));
    let connected = ProviderId::new(1);
    plugin.navigate(connected, &loc("ram", 4)).unwrap();
    let selection = ByteBlockSelection::new(vec![ByteBlockRange::new("io", 0u32, 3u32)]);
    plugin.connected_provider_mut().set_selection(selection.clone());
    let snapshot = plugin.transient_state();
    assert_eq!(snapshot.selection, selection);

    plugin.navigate(connected, &loc("io", 7)).unwrap();
    plugin.connected_provider_mut().set_selection(ByteBlockSelection::default());

    let seen = common::record_events(plugin.events());
    plugin.restore_transient_state(&snapshot).unwrap();
    assert!(seen.borrow().is_empty());
    assert_eq!(plugin.connected_provider().current_location(), Some(&loc("ram", 4)));
    assert_eq!(plugin.connected_provider().current_selection(), selection);
}

#[test]
fn test_undo_redo_state_is_keyed_by_provider() {
    let a = common::source("a", None);
    let b = common::source("b", None);
    let mut plugin = ByteViewerPlugin::standard(Services::new());
    plugin.set_current_source(Some(Rc::clone(&a)));
    assert!(plugin.undo_redo_state(a.as_ref()).is_none());

    let twin = plugin.create_new_disconnected_provider(Rc::clone(&a));
    let other = plugin.create_new_disconnected_provider(Rc::clone(&b));
    plugin.navigate(ProviderId::new(1), &loc("ram", 1)).unwrap();
    plugin.navigate(twin, &loc("io", 1)).unwrap();
    plugin.navigate(other, &loc("ram", 5)).unwrap();

    let state = plugin.undo_redo_state(a.as_ref()).unwrap();
    assert_eq!(state.ids().collect::<Vec<_>>(), vec![ProviderId::new(1), twin]);
    assert!(state.get(other).is_none());

    // A plugin rebuilt the same way hands out the same ids.
    let mut rebuilt = ByteViewerPlugin::standard(Services::new());
    rebuilt.set_current_source(Some(Rc::clone(&a)));
    assert_eq!(rebuilt.create_new_disconnected_provider(Rc::clone(&a)), twin);
    assert_eq!(rebuilt.create_new_disconnected_provider(Rc::clone(&b)), other);
    rebuilt.navigate(ProviderId::new(1), &loc("ram", 2)).unwrap();
    rebuilt.navigate(twin, &loc("io", 2)).unwrap();
    rebuilt.navigate(other, &loc("ram", 6)).unwrap();
    rebuilt.restore_undo_redo_state(a.as_ref(), &state);

    assert_eq!(rebuilt.connected_provider().current_location(), Some(&loc("ram", 1)));
    assert_eq!(rebuilt.provider(twin).unwrap().current_location(), Some(&loc("io", 1)));
    assert_eq!(rebuilt.provider(other).unwrap().current_location(), Some(&loc("ram", 6)));
}

#[test]
fn test_close_provider() {
    let source = common::source("demo", None);
    let mut plugin = ByteViewerPlugin::standard(Services::new());
    let id = plugin.create_new_disconnected_provider(source);

    plugin.close_provider(ProviderId::new(1)).unwrap();
    assert!(!plugin.connected_provider().is_visible());
    assert!(plugin.provider(ProviderId::new(1)).is_some());

    plugin.close_provider(id).unwrap();
    assert!(plugin.disconnected_providers().is_empty());
    match plugin.close_provider(id) {
        Err(ViewerError::UnknownProvider(missing)) => assert_eq!(missing, id),
        other => panic!("expected unknown provider, got {:?}", other),
    }
}

#[test]
fn test_only_connected_navigation_is_exported() {
    let go_to = Rc::new(RecordingGoTo::default());
    let source = common::source("demo", None);
    let mut plugin = ByteViewerPlugin::standard(Services::new().with_go_to(go_to.clone()));
    plugin.set_current_source(Some(Rc::clone(&source)));
    let twin = plugin.create_new_disconnected_provider(source);

    assert!(plugin.navigate(ProviderId::new(1), &loc("ram", 4)).unwrap());
    assert!(plugin.navigate(twin, &loc("ram", 5)).unwrap());
    assert!(!plugin.navigate(ProviderId::new(1), &loc("rom", 0)).unwrap());
    assert_eq!(go_to.visited.borrow().as_slice(), ["demo:ram@4"]);

    let seen = common::record_events(plugin.events());
    assert!(plugin.external_location_changed(&loc("io", 3)).unwrap());
    assert_eq!(plugin.connected_provider().current_location(), Some(&loc("io", 3)));
    assert!(seen.borrow().is_empty());
    assert_eq!(go_to.visited.borrow().len(), 1);

    assert!(matches!(
        plugin.navigate(ProviderId::new(42), &loc("ram", 0)),
        Err(ViewerError::UnknownProvider(_))
    ));
}

#[test]
fn test_init_hands_clipboard_to_providers() {
    let clipboard = Rc::new(RecordingClipboard::default());
    let source = common::source("demo", None);
    let mut plugin = ByteViewerPlugin::standard(Services::new().with_clipboard(clipboard.clone()));
    plugin.set_current_source(Some(source));
    plugin
        .connected_provider_mut()
        .set_selection(ByteBlockSelection::new(vec![ByteBlockRange::new("ram", 0u32, 1u32)]));
    assert!(!plugin.connected_provider().copy_selection().unwrap());

    plugin.init();
    assert!(plugin.connected_provider().copy_selection().unwrap());
    assert_eq!(clipboard.copied.borrow().as_slice(), ["00 01"]);

    plugin.set_status_message("copied");
    assert_eq!(plugin.status_message(), Some("copied"));
    plugin.dispose();
    assert_eq!(plugin.connected_provider().lifecycle(), ProviderLifecycle::Disposed);
}
