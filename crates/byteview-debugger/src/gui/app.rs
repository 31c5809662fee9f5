/*! Application wrapper.

`Debugger` owns a `ByteViewerPlugin` and shows one of its providers at a
time: the connected one (following the file given on the command line) or
any disconnected view opened from the toolbar.
*/

use std::cell::RefCell;
use std::rc::Rc;

use byteview::{
    ByteBlockRange, ByteBlockSelection, ByteSource, ByteViewerPlugin, ByteViewerProvider,
    ClipboardService, FORMAT_NAMES, GoToService, ProviderId, Services, ViewerLocation,
    ViewerProvider,
};
use eframe::egui;
use eframe::{CreationContext, Frame, NativeOptions};
use tracing::debug;

use super::{FieldClick, ProviderView};

const CONNECTED: ProviderId = ProviderId::new(1);

/// Launch the GUI, optionally on an initial source.
pub fn run_gui(initial: Option<Rc<dyn ByteSource>>) {
    let native_options = NativeOptions {
        initial_window_size: Some(egui::vec2(1024.0, 800.0)),
        min_window_size: Some(egui::vec2(640.0, 200.0)),
        ..NativeOptions::default()
    };

    if let Err(err) = eframe::run_native(
        "byteview debugger",
        native_options,
        Box::new(move |cc: &CreationContext| Box::new(Debugger::new(cc, initial))),
    ) {
        eprintln!("failed to launch native window: {:?}", err);
    }
}

/// Copied text waits here until the next frame hands it to egui.
#[derive(Default)]
struct PendingClipboard {
    text: RefCell<Option<String>>,
}

impl ClipboardService for PendingClipboard {
    fn copy(&self, text: &str) {
        *self.text.borrow_mut() = Some(text.to_string());
    }
}

/// Remembers the last location exported by the connected view.
#[derive(Default)]
struct LastExported {
    location: RefCell<Option<String>>,
}

impl GoToService for LastExported {
    fn go_to(&self, source: &dyn ByteSource, location: &ViewerLocation) -> bool {
        *self.location.borrow_mut() = Some(format!("{} {}", source.name(), location));
        true
    }
}

pub struct Debugger {
    plugin: ByteViewerPlugin<ByteViewerProvider>,
    view: ProviderView,
    active: ProviderId,
    highlight: String,
    clipboard: Rc<PendingClipboard>,
    exported: Rc<LastExported>,
}

impl Debugger {
    pub fn new(cc: &CreationContext, initial: Option<Rc<dyn ByteSource>>) -> Self {
        // Increase UI scaling by 1.2x for better readability.
        let ctx = &cc.egui_ctx;
        ctx.set_pixels_per_point(ctx.pixels_per_point() * 1.2);

        let clipboard = Rc::new(PendingClipboard::default());
        let exported = Rc::new(LastExported::default());
        let services = Services::new()
            .with_clipboard(clipboard.clone())
            .with_go_to(exported.clone());
        let mut plugin = ByteViewerPlugin::standard(services);
        plugin.init();
        plugin.set_current_source(initial);

        Self {
            plugin,
            view: ProviderView::new(),
            active: CONNECTED,
            highlight: String::new(),
            clipboard,
            exported,
        }
    }

    fn provider_ids(&self) -> Vec<ProviderId> {
        std::iter::once(CONNECTED)
            .chain(self.plugin.disconnected_providers().iter().map(|p| p.id()))
            .collect()
    }

    fn report(&mut self, result: Result<bool, byteview::ViewerError>, what: &str) {
        match result {
            Ok(true) => {}
            Ok(false) => self.plugin.set_status_message(format!("{what}: nothing to do")),
            Err(e) => self.plugin.set_status_message(format!("{what}: {e}")),
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for id in self.provider_ids() {
                let label = if id == CONNECTED {
                    "connected".to_string()
                } else {
                    id.to_string()
                };
                if ui.selectable_label(self.active == id, label).clicked() {
                    self.active = id;
                }
            }
            if ui.button("New view").clicked() {
                if let Some(source) = self.plugin.current_source().cloned() {
                    self.active = self.plugin.create_new_disconnected_provider(source);
                }
            }
            if self.active != CONNECTED && ui.button("Close view").clicked() {
                if let Err(e) = self.plugin.close_provider(self.active) {
                    self.plugin.set_status_message(e.to_string());
                }
                self.active = CONNECTED;
            }
        });

        let Some(provider) = self.plugin.provider_mut(self.active) else {
            self.active = CONNECTED;
            return;
        };
        let mut status = None;
        ui.horizontal(|ui| {
            let names = provider.view_names();
            for name in FORMAT_NAMES {
                let mut shown = names.iter().any(|n| n == name);
                if ui.checkbox(&mut shown, name).changed() {
                    if shown {
                        if let Err(e) = provider.add_view(name) {
                            status = Some(format!("{name}: {e}"));
                        }
                    } else {
                        provider.remove_view(name);
                    }
                }
            }
            ui.separator();

            let mut bpl = provider.bytes_per_line();
            egui::ComboBox::from_label("bytes/line")
                .selected_text(bpl.to_string())
                .show_ui(ui, |ui| {
                    for n in [8, 16, 32] {
                        ui.selectable_value(&mut bpl, n, n.to_string());
                    }
                });
            if bpl != provider.bytes_per_line() {
                if let Err(e) = provider.set_bytes_per_line(bpl) {
                    status = Some(e.to_string());
                }
            }

            let mut edit = provider.is_edit_mode();
            if ui.toggle_value(&mut edit, "Edit").changed() {
                provider.set_edit_mode(edit);
            }
            if ui.button("<").clicked() {
                status = provider.back().err().map(|e| e.to_string());
            }
            if ui.button(">").clicked() {
                status = provider.forward().err().map(|e| e.to_string());
            }
            if ui.button("Copy").clicked() {
                status = match provider.copy_selection() {
                    Ok(true) => Some("copied".to_string()),
                    Ok(false) => Some("nothing selected".to_string()),
                    Err(e) => Some(e.to_string()),
                };
            }
            ui.label("find");
            if ui.text_edit_singleline(&mut self.highlight).changed() {
                let pattern = Some(self.highlight.as_str()).filter(|s| !s.is_empty());
                provider.set_highlight_text(pattern);
            }
        });
        if let Some(status) = status {
            self.plugin.set_status_message(status);
        }
    }

    fn on_click(&mut self, click: FieldClick, extend: bool) {
        let Some(provider) = self.plugin.provider_mut(self.active) else {
            return;
        };
        provider.set_current_view(&click.view);
        let Some(info) = provider
            .index_map()
            .and_then(|map| map.get_block_info(&click.row, click.field_offset))
        else {
            return;
        };
        let target = ViewerLocation::new(info.block().name(), info.offset().clone());

        if extend {
            if let Some(anchor) = provider.current_location().filter(|l| l.block == target.block) {
                let (start, end) = if anchor.offset <= target.offset {
                    (anchor.offset.clone(), target.offset.clone())
                } else {
                    (target.offset.clone(), anchor.offset.clone())
                };
                provider.set_selection(ByteBlockSelection::new(vec![ByteBlockRange::new(
                    target.block.as_str(),
                    start,
                    end,
                )]));
                return;
            }
        }
        debug!(provider = %self.active, location = %target, "click");
        let result = self.plugin.navigate(self.active, &target);
        self.report(result, "go to");
    }

    fn on_typed(&mut self, text: &str) {
        let Some(provider) = self.plugin.provider_mut(self.active) else {
            return;
        };
        if !provider.is_edit_mode() {
            return;
        }
        let Some(view) = provider.current_view().map(str::to_string) else {
            return;
        };
        for ch in text.chars() {
            let result = provider.edit_at_cursor(&view, ch);
            if let Err(e) = result {
                self.plugin.set_status_message(format!("edit: {e}"));
                return;
            }
        }
    }
}

impl eframe::App for Debugger {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        if let Some(text) = self.clipboard.text.borrow_mut().take() {
            ctx.output_mut(|o| o.copied_text = text);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.toolbar(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let source = self
                    .plugin
                    .provider(self.active)
                    .and_then(|p| p.source())
                    .map(|s| s.name().to_string())
                    .unwrap_or_else(|| "no file".to_string());
                ui.label(source);
                if let Some(exported) = self.exported.location.borrow().as_deref() {
                    ui.separator();
                    ui.label(format!("exported {exported}"));
                }
                if let Some(status) = self.plugin.status_message() {
                    ui.separator();
                    ui.label(status);
                }
            });
        });

        let mut click = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(provider) = self.plugin.provider(self.active) {
                click = self.view.show(ui, provider);
            }
        });

        let extend = ctx.input(|i| i.modifiers.shift);
        if let Some(click) = click {
            self.on_click(click, extend);
        }

        let typed: String = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        });
        if !typed.is_empty() && !ctx.wants_keyboard_input() {
            self.on_typed(&typed);
        }
    }
}
