use anyhow::{anyhow, Context};
use eframe::egui;
use std::sync::Arc;
use stream_graphics::compose::qr::QrCodeEncoder;
use stream_graphics::compose::FontFace;
use stream_graphics::config::{exe_dir, AppConfig};
use stream_graphics::gui::StreamGraphicsApp;
use stream_graphics::preview::{PreviewContext, PreviewController};
use stream_graphics::settings::JsonFileStore;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    stream_graphics::logging::init(config.debug_logging, config.log_file.clone());

    let exe_path = std::env::current_exe().context("resolve current executable")?;
    let base = exe_dir(&exe_path)?;
    let store_path = config.resolve_store_path(&base);
    let export_dir = config.resolve_export_dir(&base);
    let font = FontFace::load(config.font_path.as_deref())?;
    tracing::info!(
        store = %store_path.display(),
        exports = %export_dir.display(),
        "starting stream graphics"
    );

    let controller = PreviewController::new(PreviewContext {
        store: Box::new(JsonFileStore::open(store_path)),
        encoder: Arc::new(QrCodeEncoder),
        font,
        fast_debounce: config.fast_debounce(),
        slow_debounce: config.slow_debounce(),
    });

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 820.0])
            .with_min_inner_size([480.0, 400.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Stream Graphics",
        native_options,
        Box::new(move |_cc| Box::new(StreamGraphicsApp::new(controller, export_dir))),
    )
    .map_err(|e| anyhow!("failed to run the window: {e}"))
}
