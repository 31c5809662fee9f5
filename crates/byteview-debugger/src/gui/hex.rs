//! Painter-based view of one `ByteViewerProvider`.
//!
//! Rows come from `ByteViewerProvider::render_row`, so everything the
//! library decides (placeholders, edit colours, selection, cursor) is drawn
//! as is. Field geometry is in font-metric units and scaled to the glyph
//! width of the monospace font in use.
//!
//! Only visible rows are rendered; the scroll area is sized from the row
//! count.

use byteview::field::HIGHLIGHT_COLOR;
use byteview::{ByteViewerProvider, Color, DEFAULT_FOREGROUND, RenderedRow};
use eframe::egui;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Rows beyond this are not reachable by scrolling.
const MAX_SCROLL_ROWS: usize = 1 << 24;

/// A click on a field: which row, slot and pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldClick {
    pub row: BigUint,
    pub field_offset: usize,
    pub view: String,
}

pub struct ProviderView {
    font_size: f32,
    /// Gap between the address column and the first pane, and between panes.
    pane_gap: f32,
}

impl ProviderView {
    pub fn new() -> Self {
        Self {
            font_size: 13.0,
            pane_gap: 16.0,
        }
    }

    /// Draw `provider` inside a vertical scroll area. Returns the field
    /// clicked this frame, if any.
    pub fn show(&mut self, ui: &mut egui::Ui, provider: &ByteViewerProvider) -> Option<FieldClick> {
        let font = egui::FontId::monospace(self.font_size);
        let glyph_w = ui.fonts(|f| f.glyph_width(&font, '0'));
        let row_height = ui.fonts(|f| f.row_height(&font)) + 4.0;
        let scale = glyph_w / provider.metrics().char_width.max(1) as f32;
        let label_width = glyph_w * 16.0 + self.pane_gap;

        let total = provider
            .num_rows()
            .to_usize()
            .unwrap_or(MAX_SCROLL_ROWS)
            .min(MAX_SCROLL_ROWS);

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_rows(ui, row_height, total, |ui, range| {
                for row in range {
                    let Some(rendered) = provider.render_row(&BigUint::from(row)) else {
                        continue;
                    };
                    let layout = RowLayout {
                        font: &font,
                        glyph_w,
                        row_height,
                        scale,
                        label_width,
                        pane_gap: self.pane_gap,
                    };
                    if let Some(hit) = layout.paint(ui, provider, &rendered) {
                        clicked = Some(hit);
                    }
                }
            });
        clicked
    }
}

impl Default for ProviderView {
    fn default() -> Self {
        Self::new()
    }
}

struct RowLayout<'a> {
    font: &'a egui::FontId,
    glyph_w: f32,
    row_height: f32,
    scale: f32,
    label_width: f32,
    pane_gap: f32,
}

impl RowLayout<'_> {
    fn pane_starts(&self, provider: &ByteViewerProvider, left: f32) -> Vec<f32> {
        let mut x = left + self.label_width;
        provider
            .views()
            .iter()
            .map(|view| {
                let start = x;
                x += view.width() as f32 * self.scale + self.pane_gap;
                start
            })
            .collect()
    }

    fn paint(
        &self,
        ui: &mut egui::Ui,
        provider: &ByteViewerProvider,
        row: &RenderedRow,
    ) -> Option<FieldClick> {
        let starts = self.pane_starts(provider, 0.0);
        let width = starts.last().copied().unwrap_or(self.label_width)
            + provider
                .views()
                .last()
                .map(|v| v.width() as f32 * self.scale)
                .unwrap_or(0.0);
        let (rect, resp) =
            ui.allocate_exact_size(egui::vec2(width, self.row_height), egui::Sense::click());
        let painter = ui.painter_at(rect);
        let text_color = ui.visuals().text_color();
        let to_color32 = |c: Color| {
            if c == DEFAULT_FOREGROUND {
                text_color
            } else {
                egui::Color32::from_rgb(c.r, c.g, c.b)
            }
        };

        if let Some(label) = &row.label {
            painter.text(
                rect.min,
                egui::Align2::LEFT_TOP,
                label,
                self.font.clone(),
                text_color,
            );
        }

        for (pane, start) in row.panes.iter().zip(&starts) {
            let pane_x = rect.min.x + start;
            for rendered in pane.fields.iter().flatten() {
                let field = &rendered.field;
                let x = pane_x + field.start_x() as f32 * self.scale;
                let cell = egui::Rect::from_min_size(
                    egui::pos2(x, rect.min.y),
                    egui::vec2(field.width() as f32 * self.scale, self.row_height),
                );
                if rendered.selected {
                    painter.rect_filled(cell, 0.0, ui.visuals().selection.bg_fill);
                } else if rendered.highlighted {
                    painter.rect_filled(cell, 0.0, to_color32(HIGHLIGHT_COLOR));
                }
                for h in field.highlights() {
                    let span = egui::Rect::from_min_size(
                        egui::pos2(x + h.start as f32 * self.glyph_w, rect.min.y),
                        egui::vec2((h.end - h.start) as f32 * self.glyph_w, self.row_height),
                    );
                    painter.rect_filled(span, 0.0, to_color32(h.color));
                }
                if let Some(column) = rendered.cursor {
                    let caret = egui::Rect::from_min_size(
                        egui::pos2(x + column as f32 * self.glyph_w, rect.min.y),
                        egui::vec2(self.glyph_w, self.row_height),
                    );
                    painter.rect_stroke(caret, 0.0, egui::Stroke::new(1.0, text_color));
                }
                painter.text(
                    egui::pos2(x, rect.min.y + 2.0),
                    egui::Align2::LEFT_TOP,
                    field.text(),
                    self.font.clone(),
                    to_color32(field.color()),
                );
            }
        }

        if !resp.clicked() {
            return None;
        }
        let pos = resp.interact_pointer_pos()?;
        for (view, start) in provider.views().iter().zip(&starts) {
            let pane_x = rect.min.x + start;
            for factory in view.factories() {
                let x0 = pane_x + factory.start_x() as f32 * self.scale;
                let x1 = x0 + factory.width() as f32 * self.scale;
                if (x0..x1).contains(&pos.x) {
                    return Some(FieldClick {
                        row: row.index.clone(),
                        field_offset: factory.field_offset(),
                        view: view.name().to_string(),
                    });
                }
            }
        }
        None
    }
}
