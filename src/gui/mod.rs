pub mod tabs;

use crate::compose::Color;
use crate::preview::{InputTier, PreviewController, RenderStatus};
use eframe::egui;
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tabs::{Tab, TabController};

pub use tabs::TabAttributes;

const QR_CANVAS_SIZES: [u32; 5] = [256, 400, 600, 800, 1024];
const CAPTION_FONT_SIZES: [u32; 5] = [12, 14, 16, 20, 24];
const OVERLAY_FONT_SIZES: [u32; 6] = [16, 20, 24, 32, 40, 48];
const OVERLAY_PADDINGS: [u32; 5] = [5, 10, 15, 20, 30];
const OVERLAY_WIDTHS: [u32; 4] = [1280, 1920, 2560, 3840];
const OVERLAY_HEIGHTS: [u32; 4] = [720, 1080, 1440, 2160];
const TOAST_SECONDS: f64 = 3.0;
const PREVIEW_MAX_WIDTH: f32 = 480.0;

/// Cached GPU texture for a preview, refreshed when the canvas revision moves.
#[derive(Default)]
struct PreviewTexture {
    revision: u64,
    handle: Option<egui::TextureHandle>,
}

impl PreviewTexture {
    fn refresh(&mut self, ctx: &egui::Context, name: &str, revision: u64, image: &image::RgbaImage) {
        if self.handle.is_some() && self.revision == revision {
            return;
        }
        self.revision = revision;
        if image.width() == 0 || image.height() == 0 {
            self.handle = None;
            return;
        }
        let size = [image.width() as usize, image.height() as usize];
        self.handle = Some(ctx.load_texture(
            name,
            egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()),
            egui::TextureOptions::LINEAR,
        ));
    }

    fn show(&self, ui: &mut egui::Ui) {
        if let Some(tex) = &self.handle {
            let mut size = tex.size_vec2();
            if size.x > PREVIEW_MAX_WIDTH {
                size *= PREVIEW_MAX_WIDTH / size.x;
            }
            ui.add(egui::Image::new(tex).fit_to_exact_size(size));
        }
    }
}

pub struct StreamGraphicsApp {
    controller: PreviewController,
    tabs: TabController,
    toasts: Toasts,
    export_dir: PathBuf,
    qr_texture: PreviewTexture,
    overlay_texture: PreviewTexture,
}

impl StreamGraphicsApp {
    pub fn new(controller: PreviewController, export_dir: PathBuf) -> Self {
        Self {
            controller,
            tabs: TabController::new(),
            toasts: Toasts::new().anchor(egui::Align2::RIGHT_TOP, [10.0, 10.0]),
            export_dir,
            qr_texture: PreviewTexture::default(),
            overlay_texture: PreviewTexture::default(),
        }
    }

    fn push_toast(&mut self, kind: ToastKind, text: String) {
        self.toasts.add(Toast {
            text: text.into(),
            kind,
            options: ToastOptions::default().duration_in_seconds(TOAST_SECONDS),
        });
    }

    fn tab_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for tab in Tab::ALL {
                let attrs = self.tabs.attributes(tab);
                if ui.selectable_label(attrs.selected, tab.label()).clicked() {
                    self.tabs.select(tab);
                }
            }
        });
    }

    fn qr_panel(&mut self, ui: &mut egui::Ui, now: Instant) {
        let mut fast = false;
        let mut slow = false;
        let form = self.controller.qr_form_mut();

        egui::Grid::new("qr_form").num_columns(2).show(ui, |ui| {
            ui.label("URL");
            fast |= ui
                .add(egui::TextEdit::singleline(&mut form.url).hint_text("https://example.com"))
                .changed();
            ui.end_row();

            ui.label("Caption");
            fast |= ui
                .add(egui::TextEdit::singleline(&mut form.caption).hint_text("Optional"))
                .changed();
            ui.end_row();

            ui.label("Canvas size");
            fast |= size_combo(ui, "qr_canvas_size", &mut form.canvas_size, &QR_CANVAS_SIZES, "px");
            ui.end_row();

            ui.label("QR size");
            fast |= ui
                .add(egui::Slider::new(&mut form.qr_size_percent, 1..=100).suffix("%"))
                .changed();
            ui.end_row();

            ui.label("Caption size");
            fast |= size_combo(
                ui,
                "qr_caption_size",
                &mut form.caption_font_size,
                &CAPTION_FONT_SIZES,
                "px",
            );
            ui.end_row();

            ui.label("QR color");
            slow |= color_field(ui, &mut form.foreground);
            ui.end_row();

            ui.label("Background");
            slow |= color_field(ui, &mut form.background);
            ui.end_row();

            ui.label("Caption color");
            slow |= color_field(ui, &mut form.caption_color);
            ui.end_row();
        });

        if fast {
            self.controller.on_qr_input(InputTier::Fast, now);
        }
        if slow {
            self.controller.on_qr_input(InputTier::Slow, now);
        }
        if let Some(err) = self.controller.qr_input_error() {
            ui.colored_label(egui::Color32::RED, err);
        }

        ui.horizontal(|ui| {
            if ui.button("Generate QR Code").clicked() {
                self.controller.render_qr_now();
            }
            let ready = self.controller.can_export_qr();
            if ui.add_enabled(ready, egui::Button::new("Download PNG")).clicked() {
                match self.controller.export_qr(&self.export_dir) {
                    Ok(path) => self.push_toast(ToastKind::Success, format!("Saved {}", path.display())),
                    Err(e) => {
                        tracing::error!(error = %format!("{e:#}"), "QR export failed");
                        self.push_toast(ToastKind::Error, format!("Export failed: {e}"));
                    }
                }
            }
            if self.controller.qr_status() == RenderStatus::Encoding {
                ui.spinner();
            }
        });
        if let Some(msg) = self.controller.qr_message() {
            ui.colored_label(egui::Color32::from_rgb(220, 120, 0), msg);
        }

        if self.controller.is_qr_visible() {
            self.qr_texture.refresh(
                ui.ctx(),
                "qr_preview",
                self.controller.qr_revision(),
                self.controller.qr_canvas().image(),
            );
            ui.separator();
            self.qr_texture.show(ui);
        }
    }

    fn overlay_panel(&mut self, ui: &mut egui::Ui, now: Instant) {
        let mut fast = false;
        let mut slow = false;
        let form = self.controller.overlay_form_mut();

        egui::Grid::new("overlay_form").num_columns(2).show(ui, |ui| {
            ui.label("Event title");
            fast |= ui
                .add(egui::TextEdit::singleline(&mut form.title).hint_text("Live Now"))
                .changed();
            ui.end_row();

            ui.label("Font size");
            fast |= size_combo(ui, "overlay_font_size", &mut form.font_size, &OVERLAY_FONT_SIZES, "px");
            ui.end_row();

            ui.label("Padding");
            fast |= size_combo(ui, "overlay_padding", &mut form.padding, &OVERLAY_PADDINGS, "px");
            ui.end_row();

            ui.label("Width");
            fast |= size_combo(ui, "overlay_width", &mut form.canvas_width, &OVERLAY_WIDTHS, "px");
            ui.end_row();

            ui.label("Height");
            fast |= size_combo(ui, "overlay_height", &mut form.canvas_height, &OVERLAY_HEIGHTS, "px");
            ui.end_row();

            ui.label("Bar color");
            slow |= color_field(ui, &mut form.background);
            ui.end_row();

            ui.label("Text color");
            slow |= color_field(ui, &mut form.text_color);
            ui.end_row();
        });

        if fast {
            self.controller.on_overlay_input(InputTier::Fast, now);
        }
        if slow {
            self.controller.on_overlay_input(InputTier::Slow, now);
        }
        if let Some(err) = self.controller.overlay_input_error() {
            ui.colored_label(egui::Color32::RED, err);
        }

        ui.horizontal(|ui| {
            if ui.button("Generate Overlay").clicked() {
                self.controller.render_overlay_now();
            }
            let ready = self.controller.is_overlay_visible();
            if ui.add_enabled(ready, egui::Button::new("Download PNG")).clicked() {
                match self.controller.export_overlay(&self.export_dir) {
                    Ok(path) => self.push_toast(ToastKind::Success, format!("Saved {}", path.display())),
                    Err(e) => {
                        tracing::error!(error = %format!("{e:#}"), "overlay export failed");
                        self.push_toast(ToastKind::Error, format!("Export failed: {e}"));
                    }
                }
            }
        });
        if let Some(msg) = self.controller.overlay_message() {
            ui.colored_label(egui::Color32::from_rgb(220, 120, 0), msg);
        }

        if self.controller.is_overlay_visible() {
            self.overlay_texture.refresh(
                ui.ctx(),
                "overlay_preview",
                self.controller.overlay_revision(),
                self.controller.overlay_canvas().image(),
            );
            ui.separator();
            // Dark backdrop so the transparent area is visible.
            egui::Frame::none()
                .fill(egui::Color32::from_gray(40))
                .show(ui, |ui| self.overlay_texture.show(ui));
        }
    }
}

impl eframe::App for StreamGraphicsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.controller.tick(now);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| self.tab_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.tabs.active() {
                Tab::QrCode => self.qr_panel(ui, now),
                Tab::Overlay => self.overlay_panel(ui, now),
            });
        });
        self.toasts.show(ctx);

        if let Some(wait) = self.controller.next_wakeup(Instant::now()) {
            ctx.request_repaint_after(wait.max(Duration::from_millis(1)));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.shutdown();
    }
}

/// Pick from a fixed list of pixel sizes. Returns true when the value changed.
fn size_combo(ui: &mut egui::Ui, id: &str, value: &mut u32, choices: &[u32], unit: &str) -> bool {
    let before = *value;
    egui::ComboBox::from_id_source(id)
        .selected_text(format!("{value}{unit}"))
        .show_ui(ui, |ui| {
            for choice in choices {
                ui.selectable_value(value, *choice, format!("{choice}{unit}"));
            }
        });
    *value != before
}

/// Color button bound to a hex string. Unparseable values show as black and
/// are replaced on the first edit.
fn color_field(ui: &mut egui::Ui, value: &mut String) -> bool {
    let mut rgba = Color::from_hex(value).unwrap_or(Color::BLACK).to_rgba_array();
    if ui.color_edit_button_srgba_unmultiplied(&mut rgba).changed() {
        let [r, g, b, a] = rgba;
        *value = Color::rgba(r, g, b, a).to_hex();
        true
    } else {
        false
    }
}
