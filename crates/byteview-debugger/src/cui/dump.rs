//! `dump`: render rows of a file through the viewer and print them.

use std::rc::Rc;

use anyhow::{Context, Result};
use byteview::{ByteSource, ByteViewerPlugin, ByteViewerProvider, RenderedRow, Services};
use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};
use num_bigint::BigUint;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Panes to show, in order. Empty keeps the default hex pane.
    pub views: Vec<String>,
    pub bytes_per_line: usize,
    pub hex_group_size: usize,
    pub offset: usize,
    /// First row to print.
    pub start: usize,
    /// Row limit; `None` prints to the end.
    pub rows: Option<usize>,
    /// Space-padded text instead of a table.
    pub plain: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            views: Vec::new(),
            bytes_per_line: 16,
            hex_group_size: 1,
            offset: 0,
            start: 0,
            rows: None,
            plain: false,
        }
    }
}

/// Pad a &str to a target display width (columns) using unicode-width.
fn pad_to_width(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

/// Apply the dump options to a provider. Unlike a restore from saved
/// state, any invalid value is an error here.
pub fn configure(provider: &mut ByteViewerProvider, opts: &DumpOptions) -> Result<()> {
    provider
        .set_bytes_per_line(opts.bytes_per_line)
        .with_context(|| format!("bytes per line {}", opts.bytes_per_line))?;
    provider
        .set_hex_group_size(opts.hex_group_size)
        .with_context(|| format!("hex group size {}", opts.hex_group_size))?;
    if !opts.views.is_empty() {
        for name in &opts.views {
            provider
                .add_view(name)
                .with_context(|| format!("view {name}"))?;
        }
        for name in provider.view_names() {
            if !opts.views.contains(&name) {
                provider.remove_view(&name);
            }
        }
    }
    provider.set_block_offset(opts.offset)?;
    Ok(())
}

/// Rows `start..start + limit`, clipped to the provider's row count.
pub fn collect_rows(
    provider: &ByteViewerProvider,
    start: usize,
    limit: Option<usize>,
) -> Vec<RenderedRow> {
    let total = provider.num_rows();
    let mut rows = Vec::new();
    let mut index = BigUint::from(start);
    while index < total && limit.is_none_or(|n| rows.len() < n) {
        if let Some(row) = provider.render_row(&index) {
            rows.push(row);
        }
        index += 1u32;
    }
    rows
}

/// Single-symbol panes (ASCII) read better without gaps.
fn pane_separators(provider: &ByteViewerProvider) -> Vec<&'static str> {
    provider
        .views()
        .iter()
        .map(|v| {
            if v.model().data_unit_symbol_size() == 1 {
                ""
            } else {
                " "
            }
        })
        .collect()
}

pub fn render_table(provider: &ByteViewerProvider, rows: &[RenderedRow]) -> Table {
    let separators = pane_separators(provider);
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Disabled);

    let mut header = vec![Cell::new("Address")];
    header.extend(provider.view_names().into_iter().map(Cell::new));
    table.set_header(header);

    for row in rows {
        let mut cells = vec![Cell::new(row.label.clone().unwrap_or_default())];
        for (i, sep) in separators.iter().enumerate() {
            cells.push(Cell::new(row.pane_text(i, sep).unwrap_or_default()));
        }
        table.add_row(cells);
    }
    table
}

pub fn render_plain(provider: &ByteViewerProvider, rows: &[RenderedRow]) -> String {
    let separators = pane_separators(provider);
    let label_width = rows
        .iter()
        .filter_map(|r| r.label.as_deref())
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for row in rows {
        let panes: Vec<String> = separators
            .iter()
            .enumerate()
            .filter_map(|(i, sep)| row.pane_text(i, sep))
            .collect();
        let line = format!(
            "{}  {}",
            pad_to_width(row.label.as_deref().unwrap_or(""), label_width),
            panes.join(" | ")
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Render the requested rows of `source` as text.
pub fn dump(source: Rc<dyn ByteSource>, opts: &DumpOptions) -> Result<String> {
    let mut plugin = ByteViewerPlugin::standard(Services::new());
    configure(plugin.connected_provider_mut(), opts)?;
    plugin.set_current_source(Some(source));

    let provider = plugin.connected_provider();
    let rows = collect_rows(provider, opts.start, opts.rows);
    if opts.plain {
        Ok(render_plain(provider, &rows))
    } else {
        Ok(render_table(provider, &rows).to_string())
    }
}
