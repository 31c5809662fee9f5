//! `session save` / `session restore`: persist and re-open a set of views.
//!
//! A session file is one JSON-encoded `SaveState` holding the connected
//! provider's config state, the plugin's data state (which carries the
//! disconnected providers) and the durable path of the current source.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use byteview::{
    ByteViewerPlugin, ByteViewerProvider, ProviderId, SaveState, Services, SourceResolver,
    ViewerLocation, ViewerProvider,
};
use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};
use tracing::warn;

use crate::image::{ImageLayout, open_image};

const KEY_CURRENT_PATH: &str = "Current Path";
const KEY_CONFIG: &str = "Config";
const KEY_DATA: &str = "Data";

/// Open `files[0]` in the connected provider and the rest in disconnected
/// providers, optionally move the cursor, and capture the state.
pub fn save(files: &[PathBuf], at: Option<&ViewerLocation>, layout: &ImageLayout) -> Result<SaveState> {
    let (first, rest) = files.split_first().context("no input files")?;
    let mut plugin = ByteViewerPlugin::standard(Services::new());

    let current = open_image(first, layout)?;
    plugin.set_current_source(Some(Rc::clone(&current)));
    if let Some(at) = at {
        if !plugin.navigate(ProviderId::new(1), at)? {
            bail!("location {at} is not in {}", first.display());
        }
    }
    for path in rest {
        plugin.create_new_disconnected_provider(open_image(path, layout)?);
    }

    let mut config = SaveState::new();
    plugin.write_config_state(&mut config);
    let mut data = SaveState::new();
    plugin.write_data_state(&mut data);

    let mut session = SaveState::new();
    session.put_string(KEY_CURRENT_PATH, current.durable_path().unwrap_or_default());
    session.put_state(KEY_CONFIG, config);
    session.put_state(KEY_DATA, data);
    Ok(session)
}

/// Rebuild a plugin from a session. Sources that no longer resolve are
/// skipped.
pub fn restore(
    session: &SaveState,
    resolver: Rc<dyn SourceResolver>,
) -> Result<ByteViewerPlugin<ByteViewerProvider>> {
    let services = Services::new().with_resolver(Rc::clone(&resolver));
    let mut plugin = ByteViewerPlugin::standard(services);

    let current = session.get_string(KEY_CURRENT_PATH, "");
    if !current.is_empty() {
        match resolver.resolve(&current) {
            Some(source) => plugin.set_current_source(Some(source)),
            None => warn!(path = %current, "current source is gone"),
        }
    }
    if let Some(config) = session.get_state(KEY_CONFIG) {
        plugin.read_config_state(config)?;
    }
    if let Some(data) = session.get_state(KEY_DATA) {
        plugin.read_data_state(data)?;
    }
    Ok(plugin)
}

pub fn write_session(path: &Path, session: &SaveState) -> Result<()> {
    let json = session.to_json()?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_session(path: &Path) -> Result<SaveState> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    SaveState::from_json(&json).with_context(|| format!("invalid session {}", path.display()))
}

/// One line per provider: id, kind, source, cursor and panes.
pub fn provider_table(plugin: &ByteViewerPlugin<ByteViewerProvider>) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table.set_header(vec![
        Cell::new("Provider"),
        Cell::new("Kind"),
        Cell::new("Source"),
        Cell::new("Location"),
        Cell::new("Views"),
    ]);

    let providers = std::iter::once(plugin.connected_provider()).chain(plugin.disconnected_providers());
    for provider in providers {
        let kind = if provider.is_connected() {
            "connected"
        } else {
            "disconnected"
        };
        let source = provider
            .source()
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| "-".to_string());
        let location = provider
            .current_location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(provider.id()),
            Cell::new(kind),
            Cell::new(source),
            Cell::new(location),
            Cell::new(provider.view_names().join(",")),
        ]);
    }
    table
}
