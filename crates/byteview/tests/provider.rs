mod common;

use std::rc::Rc;

use byteview::{
    ByteBlockRange, ByteBlockSelection, ByteSource, ByteViewerProvider, CHANGED_VALUE_COLOR,
    EventBus, ProviderContext, ProviderId, ProviderLifecycle, SaveState, StateError,
    ViewerError, ViewerEvent, ViewerLocation, ViewerProvider, ViewerUndoState,
};
use num_bigint::BigUint;

use common::RecordingClipboard;

fn idx(v: u32) -> BigUint {
    BigUint::from(v)
}

fn new_provider() -> ByteViewerProvider {
    ByteViewerProvider::new(ProviderContext {
        id: ProviderId::new(1),
        connected: true,
        events: EventBus::new(),
    })
}

/// Provider attached to a fresh fixture source at 8 bytes per line.
fn attached(source: &Rc<dyn ByteSource>) -> ByteViewerProvider {
    let mut provider = new_provider();
    provider.set_bytes_per_line(8).unwrap();
    provider.attach(Rc::clone(source));
    provider
}

#[test]
fn test_attach_binds_rows() {
    let source = common::source("demo", Some("/demo"));
    let mut provider = new_provider();
    assert_eq!(provider.lifecycle(), ProviderLifecycle::Unattached);
    assert!(provider.render_row(&idx(0)).is_none());
    assert!(matches!(
        provider.go_to(&ViewerLocation::new("ram", 0u32)),
        Err(ViewerError::NotAttached)
    ));

    provider.set_bytes_per_line(8).unwrap();
    provider.attach(Rc::clone(&source));
    assert_eq!(provider.lifecycle(), ProviderLifecycle::Attached);
    assert_eq!(provider.num_rows(), idx(4));

    let row = provider.render_row(&idx(3)).unwrap();
    assert_eq!(row.label.as_deref(), Some("io:00002000"));
    assert_eq!(row.pane_text(0, " ").unwrap(), "a0 a1 a2 a3 a4 a5 a6 a7");

    let gap = provider.render_row(&idx(2)).unwrap();
    assert_eq!(gap.label, None);
    assert_eq!(gap.pane_text(0, "").unwrap(), "................");

    let partial = provider.render_row(&idx(1)).unwrap();
    assert_eq!(partial.pane_text(0, " ").unwrap(), "?? ?? 0a 0b 0c 0d 0e 0f");

    provider.set_source(None);
    assert_eq!(provider.lifecycle(), ProviderLifecycle::Unattached);
    assert!(provider.render_row(&idx(0)).is_none());
}

#[test]
fn test_disposed_provider_refuses_operations() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    provider.dispose();
    assert_eq!(provider.lifecycle(), ProviderLifecycle::Disposed);
    assert!(provider.source().is_none());
    assert!(provider.render_row(&idx(0)).is_none());
    assert!(matches!(
        provider.go_to(&ViewerLocation::new("ram", 0u32)),
        Err(ViewerError::Disposed(id)) if id == ProviderId::new(1)
    ));
    assert!(matches!(provider.add_view("Ascii"), Err(ViewerError::Disposed(_))));

    // Attaching again does not revive it.
    provider.attach(source);
    assert_eq!(provider.lifecycle(), ProviderLifecycle::Disposed);
}

#[test]
fn test_view_configuration_is_validated() {
    let mut provider = new_provider();
    assert_eq!(provider.view_names(), vec!["Hex"]);
    provider.set_hex_group_size(4).unwrap();
    match provider.set_bytes_per_line(6) {
        Err(ViewerError::InvalidBytesPerLine {
            bytes_per_line: 6,
            unit: 4,
        }) => {}
        other => panic!("expected invalid bytes per line, got {:?}", other),
    }
    assert_eq!(provider.bytes_per_line(), 16);

    match provider.add_view("Float") {
        Err(ViewerError::State(StateError::UnknownFormat(name))) => assert_eq!(name, "Float"),
        other => panic!("expected unknown format, got {:?}", other),
    }
    assert!(matches!(
        provider.set_hex_group_size(3),
        Err(ViewerError::State(StateError::InvalidValue { .. }))
    ));

    provider.add_view("Ascii").unwrap();
    provider.add_view("Ascii").unwrap();
    assert_eq!(provider.view_names(), vec!["Hex", "Ascii"]);
    assert_eq!(provider.views()[0].factories().len(), 4);
    assert_eq!(provider.views()[1].factories().len(), 16);
    assert!(provider.remove_view("Ascii"));
    assert!(!provider.remove_view("Ascii"));
}

#[test]
fn test_block_offset_shifts_row_starts() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    provider.set_block_offset(4).unwrap();
    // Rows now start at addresses congruent to 4: ram is padded by 4 slots.
    let row = provider.render_row(&idx(0)).unwrap();
    assert_eq!(row.pane_text(0, " ").unwrap(), "            00 01 02 03");
    assert_eq!(provider.block_offset(), 4);
}

#[test]
fn test_navigation_history_and_events() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    let seen = common::record_events(provider.events());

    let a = ViewerLocation::new("ram", 2u32);
    let b = ViewerLocation::new("io", 5u32);
    assert!(provider.go_to(&a).unwrap());
    assert!(provider.go_to(&b).unwrap());
    assert!(!provider.go_to(&ViewerLocation::new("ram", 0x40u32)).unwrap());
    assert_eq!(provider.cursor_position(), Some((idx(3), 5)));

    assert!(provider.back().unwrap());
    assert_eq!(provider.current_location(), Some(&a));
    assert!(provider.forward().unwrap());
    assert_eq!(provider.current_location(), Some(&b));
    assert!(!provider.forward().unwrap());

    assert!(provider.go_to_index(&idx(1), 7).unwrap());
    assert_eq!(provider.current_location(), Some(&ViewerLocation::new("ram", 15u32)));
    assert!(!provider.go_to_index(&idx(2), 0).unwrap());

    let events = seen.borrow();
    assert_eq!(events.len(), 5);
    match &events[0] {
        ViewerEvent::LocationChanged { provider, location } => {
            assert_eq!(*provider, ProviderId::new(1));
            assert_eq!(location, &a);
        }
        other => panic!("expected location change, got {:?}", other),
    }
}

#[test]
fn test_render_row_marks_selection_and_cursor() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    provider.add_view("Ascii").unwrap();
    provider.set_selection(ByteBlockSelection::new(vec![ByteBlockRange::new("ram", 1u32, 2u32)]));
    provider.set_highlight(ByteBlockSelection::new(vec![ByteBlockRange::new("ram", 7u32, 7u32)]));
    provider.go_to(&ViewerLocation::new("ram", 2u32).with_column(1)).unwrap();

    let row = provider.render_row(&idx(0)).unwrap();
    let hex = &row.panes[0];
    assert_eq!(hex.view, "Hex");
    let selected: Vec<bool> = hex.fields.iter().map(|f| f.as_ref().unwrap().selected).collect();
    assert_eq!(selected, vec![false, true, true, false, false, false, false, false]);
    assert!(hex.fields[7].as_ref().unwrap().highlighted);
    assert_eq!(hex.fields[2].as_ref().unwrap().cursor, Some(1));
    assert_eq!(hex.fields[1].as_ref().unwrap().cursor, None);

    // The other pane shows the cursor on the same byte.
    assert_eq!(row.panes[1].fields[2].as_ref().unwrap().cursor, Some(0));
}

#[test]
fn test_go_to_puts_caret_on_named_byte_in_grouped_hex() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    provider.set_hex_group_size(4).unwrap();

    // Little-endian units print their last byte first.
    provider.go_to(&ViewerLocation::new("io", 4u32)).unwrap();
    assert_eq!(provider.current_location().unwrap().column, 6);
    let row = provider.render_row(&idx(3)).unwrap();
    assert_eq!(row.panes[0].fields[1].as_ref().unwrap().cursor, Some(6));

    provider.go_to_index(&idx(3), 7).unwrap();
    assert_eq!(provider.current_location(), Some(&ViewerLocation::new("io", 7u32)));

    // A column already on the named byte is kept.
    provider.go_to(&ViewerLocation::new("io", 5u32).with_column(5)).unwrap();
    assert_eq!(provider.current_location().unwrap().column, 5);
}

#[test]
fn test_edit_at_cursor_writes_and_advances() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    provider.add_view("Decimal").unwrap();
    provider.go_to(&ViewerLocation::new("ram", 0u32)).unwrap();

    assert!(matches!(
        provider.edit_at_cursor("Hex", 'a'),
        Err(ViewerError::NotEditable)
    ));
    provider.set_edit_mode(true);
    assert!(matches!(
        provider.edit_at_cursor("Decimal", '1'),
        Err(ViewerError::NotEditable)
    ));

    assert!(provider.edit_at_cursor("Hex", 'a').unwrap());
    assert_eq!(provider.current_location().unwrap().column, 1);
    assert!(provider.edit_at_cursor("Hex", 'B').unwrap());
    assert_eq!(provider.current_location(), Some(&ViewerLocation::new("ram", 1u32)));
    assert!(!provider.edit_at_cursor("Hex", 'x').unwrap());

    let field = provider.render_row(&idx(0)).unwrap().panes[0].fields[0]
        .clone()
        .unwrap()
        .field;
    assert_eq!(field.text(), "ab");
    assert_eq!(field.color(), CHANGED_VALUE_COLOR);
}

#[test]
fn test_copy_selection_requires_clipboard() {
    let source = common::source("demo", None);
    let mut provider = attached(&source);
    provider.set_selection(ByteBlockSelection::new(vec![ByteBlockRange::new("io", 0u32, 2u32)]));
    assert!(!provider.copy_selection().unwrap());

    let clipboard = Rc::new(RecordingClipboard::default());
    provider.set_clipboard(Some(clipboard.clone()));
    assert!(provider.copy_selection().unwrap());
    assert_eq!(clipboard.copied.borrow().as_slice(), ["a0 a1 a2"]);

    // Uninitialized bytes copy as they render; a range past the block end
    // stops at the last byte.
    provider.set_selection(ByteBlockSelection::new(vec![
        ByteBlockRange::new("ram", 7u32, 10u32),
        ByteBlockRange::new("io", 6u32, 9u32),
    ]));
    assert!(provider.copy_selection().unwrap());
    assert_eq!(clipboard.copied.borrow()[1], "07 ?? ?? 0a a6 a7");
}

#[test]
fn test_data_state_round_trip() {
    let source = common::source("demo", Some("/demo"));
    let mut original = attached(&source);
    original.go_to(&ViewerLocation::new("ram", 3u32)).unwrap();
    original.go_to(&ViewerLocation::new("io", 6u32).with_column(1)).unwrap();
    original.set_selection(ByteBlockSelection::new(vec![
        ByteBlockRange::new("ram", 0u32, 4u32),
        ByteBlockRange::new("io", 1u32, 1u32),
    ]));
    let mut state = SaveState::new();
    original.write_data_state(&mut state);
    assert_eq!(state.get_string("Block Name", ""), "io");
    assert_eq!(state.get_strings("History", &[]), vec!["ram@3"]);

    // Survive an encode/decode cycle, as a saved session would.
    let state = SaveState::from_json(&state.to_json().unwrap()).unwrap();

    let mut restored = attached(&source);
    restored.read_data_state(&state).unwrap();
    assert_eq!(restored.current_location(), original.current_location());
    assert_eq!(restored.current_selection(), original.current_selection());
    assert_eq!(restored.top_index(), original.top_index());
    assert_eq!(restored.history().to_strings(), original.history().to_strings());
}

#[test]
fn test_location_restored_before_attach_applies_on_attach() {
    let source = common::source("demo", None);
    let mut state = SaveState::new();
    attached(&source).write_data_state(&mut state);
    state.put_string("Block Name", "io");
    state.put_big("Block Offset", &idx(2));

    let mut provider = new_provider();
    provider.set_bytes_per_line(8).unwrap();
    provider.restore_location(&state).unwrap();
    provider.attach(Rc::clone(&source));
    assert_eq!(provider.cursor_position(), Some((idx(3), 2)));

    // A location in a block the source does not have is dropped.
    state.put_string("Block Name", "rom");
    let mut provider = new_provider();
    provider.restore_location(&state).unwrap();
    provider.attach(source);
    assert_eq!(provider.current_location(), None);
}

#[test]
fn test_config_state_round_trip_and_fallbacks() {
    let mut original = new_provider();
    original.set_hex_group_size(2).unwrap();
    original.add_view("Ascii").unwrap();
    original.set_bytes_per_line(8).unwrap();
    original.set_block_offset(2).unwrap();
    original.set_edit_mode(true);
    let mut state = SaveState::new();
    original.write_config_state(&mut state);

    let mut restored = new_provider();
    restored.read_config_state(&state).unwrap();
    assert_eq!(restored.view_names(), vec!["Hex", "Ascii"]);
    assert_eq!(restored.hex_group_size(), 2);
    assert_eq!(restored.bytes_per_line(), 8);
    assert_eq!(restored.block_offset(), 2);
    assert!(restored.is_edit_mode());

    // Unknown views are dropped; a line width that does not fit the units
    // falls back to the default.
    let mut broken = SaveState::new();
    broken.put_strings("View Names", vec!["Bogus".into(), "Hex".into()]);
    broken.put_int("Hex Group Size", 4);
    broken.put_int("Bytes Per Line", 6);
    let mut degraded = new_provider();
    degraded.read_config_state(&broken).unwrap();
    assert_eq!(degraded.view_names(), vec!["Hex"]);
    assert_eq!(degraded.bytes_per_line(), 16);
}

#[test]
fn test_undo_state_only_for_viewed_source() {
    let source = common::source("demo", None);
    let other = common::source("other", None);
    let mut provider = attached(&source);
    assert_eq!(provider.undo_redo_state(source.as_ref()), None);

    let here = ViewerLocation::new("io", 4u32);
    provider.go_to(&here).unwrap();
    let state = provider.undo_redo_state(source.as_ref()).unwrap();
    assert_eq!(
        state,
        ViewerUndoState {
            location: here.clone(),
            top_index: idx(0),
        }
    );
    assert_eq!(provider.undo_redo_state(other.as_ref()), None);

    provider.go_to(&ViewerLocation::new("ram", 0u32)).unwrap();
    provider.restore_undo_redo_state(other.as_ref(), state.clone());
    assert_eq!(provider.current_location(), Some(&ViewerLocation::new("ram", 0u32)));
    provider.restore_undo_redo_state(source.as_ref(), state);
    assert_eq!(provider.current_location(), Some(&here));
}
