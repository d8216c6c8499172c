use image::RgbaImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::{Duration, Instant};
use stream_graphics::compose::qr::{QrCodeEncoder, QrEncodeOptions, QrEncoder, QrLayout};
use stream_graphics::compose::{Color, EncodeError, FontFace};
use stream_graphics::preview::controller::{ENCODE_FAILED_MESSAGE, QR_TOO_SMALL_MESSAGE};
use stream_graphics::preview::{InputTier, PreviewContext, PreviewController, RenderStatus};
use stream_graphics::settings::{KeyValueStore, MemoryStore, PersistedSettings, SETTINGS_KEY};

const FAST: Duration = Duration::from_millis(300);
const SLOW: Duration = Duration::from_millis(500);
const WAIT: Duration = Duration::from_secs(5);

fn controller_with(store: MemoryStore, encoder: Arc<dyn QrEncoder>) -> PreviewController {
    PreviewController::new(PreviewContext {
        store: Box::new(store),
        encoder,
        font: FontFace::builtin().unwrap(),
        fast_debounce: FAST,
        slow_debounce: SLOW,
    })
}

fn stored(store: &MemoryStore) -> Option<PersistedSettings> {
    store
        .get(SETTINGS_KEY)
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

/// Fills the whole bitmap with one color picked from the data.
struct SolidEncoder;

impl SolidEncoder {
    fn color_for(data: &str) -> Color {
        if data.contains("slow") {
            Color::rgb(200, 0, 0)
        } else {
            Color::rgb(0, 0, 200)
        }
    }
}

impl QrEncoder for SolidEncoder {
    fn encode(&self, data: &str, options: &QrEncodeOptions) -> Result<RgbaImage, EncodeError> {
        Ok(RgbaImage::from_pixel(
            options.edge,
            options.edge,
            Self::color_for(data).into(),
        ))
    }
}

/// Holds back requests for "slow" URLs until the gate opens.
struct GatedEncoder {
    gate: Mutex<Receiver<()>>,
    finished: AtomicUsize,
}

impl GatedEncoder {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = channel();
        let encoder = Arc::new(Self {
            gate: Mutex::new(rx),
            finished: AtomicUsize::new(0),
        });
        (encoder, tx)
    }
}

impl QrEncoder for GatedEncoder {
    fn encode(&self, data: &str, options: &QrEncodeOptions) -> Result<RgbaImage, EncodeError> {
        if data.contains("slow") {
            let gate = self.gate.lock().map_err(|_| EncodeError::WorkerLost)?;
            gate.recv().map_err(|_| EncodeError::WorkerLost)?;
        }
        let result = SolidEncoder.encode(data, options);
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}

struct FailingEncoder;

impl QrEncoder for FailingEncoder {
    fn encode(&self, _data: &str, _options: &QrEncodeOptions) -> Result<RgbaImage, EncodeError> {
        Err(EncodeError::Data("data too long".into()))
    }
}

/// Succeeds unless the data mentions "fail".
struct PickyEncoder;

impl QrEncoder for PickyEncoder {
    fn encode(&self, data: &str, options: &QrEncodeOptions) -> Result<RgbaImage, EncodeError> {
        if data.contains("fail") {
            return Err(EncodeError::Data("rejected".into()));
        }
        SolidEncoder.encode(data, options)
    }
}

fn qr_pixel(controller: &PreviewController) -> Color {
    let request = controller.settings().qr.to_request().unwrap();
    let layout = QrLayout::compute(&request).unwrap();
    let (x, y) = layout.qr_origin();
    controller.qr_canvas().pixel(x + 1, y + 1)
}

#[test]
fn rapid_inputs_render_once_with_latest_values() {
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), Arc::new(SolidEncoder));
    let start = Instant::now();

    c.overlay_form_mut().title = "Live".into();
    c.on_overlay_input(InputTier::Fast, start);
    c.overlay_form_mut().title = "Live Now".into();
    c.on_overlay_input(InputTier::Fast, start + Duration::from_millis(100));

    c.tick(start + FAST);
    assert_eq!(c.overlay_revision(), 0);

    c.tick(start + Duration::from_millis(400));
    c.tick(start + Duration::from_secs(2));
    assert_eq!(c.overlay_revision(), 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(stored(&store).unwrap().overlay.title, "Live Now");
    assert_eq!(c.overlay_status(), RenderStatus::Rendered);
}

#[test]
fn empty_overlay_title_is_a_no_op() {
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), Arc::new(SolidEncoder));
    let start = Instant::now();
    c.overlay_form_mut().title = "   ".into();
    c.on_overlay_input(InputTier::Fast, start);
    c.tick(start + Duration::from_secs(1));

    assert!(!c.is_overlay_visible());
    assert_eq!(c.overlay_canvas().width(), 0);
    assert_eq!(c.overlay_input_error(), None);
    assert_eq!(store.writes(), 0);
}

#[test]
fn invalid_url_reports_inline_and_skips_render() {
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), Arc::new(SolidEncoder));
    let start = Instant::now();
    c.qr_form_mut().url = "JavaScript:alert(1)".into();
    c.on_qr_input(InputTier::Fast, start);
    assert_eq!(c.qr_input_error(), Some("javascript: URLs are not allowed"));

    c.tick(start + Duration::from_secs(1));
    assert!(!c.is_encoding());
    assert!(!c.is_qr_visible());
    assert_eq!(store.writes(), 0);

    c.qr_form_mut().url = "https://example.com".into();
    c.on_qr_input(InputTier::Fast, start);
    assert_eq!(c.qr_input_error(), None);
}

#[test]
fn successful_qr_render_composites_and_saves() {
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), Arc::new(SolidEncoder));
    c.qr_form_mut().url = "https://example.com".into();
    c.qr_form_mut().caption = "Scan me".into();
    c.render_qr_now();
    assert_eq!(c.qr_status(), RenderStatus::Encoding);
    assert!(c.wait_for_encode(WAIT));

    assert!(c.is_qr_visible());
    assert_eq!(c.qr_status(), RenderStatus::Rendered);
    assert_eq!(qr_pixel(&c), Color::rgb(0, 0, 200));
    assert_eq!((c.qr_canvas().width(), c.qr_canvas().height()), (600, 600));
    assert_eq!(stored(&store).unwrap().qr.caption, "Scan me");
}

#[test]
fn real_encoder_renders_dark_modules() {
    let mut c = controller_with(MemoryStore::new(), Arc::new(QrCodeEncoder));
    c.qr_form_mut().url = "https://example.com/event".into();
    c.render_qr_now();
    assert!(c.wait_for_encode(WAIT));
    // The top-left finder pattern starts dark.
    assert_eq!(qr_pixel(&c), Color::BLACK);
}

#[test]
fn stale_encode_results_are_discarded() {
    let (encoder, gate) = GatedEncoder::new();
    let mut c = controller_with(MemoryStore::new(), encoder.clone());

    c.qr_form_mut().url = "https://slow.example".into();
    c.render_qr_now();
    c.qr_form_mut().url = "https://fast.example".into();
    c.render_qr_now();
    assert!(c.wait_for_encode(WAIT));
    assert_eq!(qr_pixel(&c), Color::rgb(0, 0, 200));
    let revision = c.qr_revision();

    gate.send(()).unwrap();
    let deadline = Instant::now() + WAIT;
    while encoder.finished.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        sleep(Duration::from_millis(5));
    }
    sleep(Duration::from_millis(50));
    c.tick(Instant::now());

    assert_eq!(qr_pixel(&c), Color::rgb(0, 0, 200));
    assert_eq!(c.qr_revision(), revision);
}

#[test]
fn encode_failure_keeps_panel_and_reports_message() {
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), Arc::new(FailingEncoder));
    c.qr_form_mut().url = "https://example.com".into();
    c.render_qr_now();
    assert!(c.wait_for_encode(WAIT));

    assert_eq!(c.qr_status(), RenderStatus::Failed);
    assert_eq!(c.qr_message(), Some(ENCODE_FAILED_MESSAGE));
    assert_eq!(c.qr_input_error(), None);
    assert_eq!(c.qr_canvas().width(), 600);
    assert!(!c.is_qr_visible());
    assert_eq!(store.writes(), 0);
}

#[test]
fn bad_color_is_an_input_error() {
    let mut c = controller_with(MemoryStore::new(), Arc::new(SolidEncoder));
    c.overlay_form_mut().title = "Live".into();
    c.overlay_form_mut().text_color = "not-a-color".into();
    c.render_overlay_now();
    assert!(c.overlay_input_error().unwrap().contains("text color"));
    assert!(!c.is_overlay_visible());
}

#[test]
fn saved_settings_populate_the_forms() {
    let mut store = MemoryStore::new();
    let mut saved = PersistedSettings::default();
    saved.overlay.title = "Welcome".into();
    saved.qr.qr_size_percent = 80;
    store
        .set(SETTINGS_KEY, serde_json::to_string(&saved).unwrap())
        .unwrap();

    let c = controller_with(store, Arc::new(SolidEncoder));
    assert_eq!(c.settings(), &saved);
}

#[test]
fn malformed_saved_settings_fall_back_to_defaults() {
    let mut store = MemoryStore::new();
    store.set(SETTINGS_KEY, "{not json".into()).unwrap();
    let c = controller_with(store, Arc::new(SolidEncoder));
    assert_eq!(c.settings(), &PersistedSettings::default());
}

#[test]
fn shutdown_cancels_pending_renders_and_saves_forms() {
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), Arc::new(SolidEncoder));
    let start = Instant::now();
    c.overlay_form_mut().title = "Later".into();
    c.on_overlay_input(InputTier::Slow, start);
    c.shutdown();
    c.tick(start + Duration::from_secs(1));

    assert!(!c.is_overlay_visible());
    assert_eq!(stored(&store).unwrap().overlay.title, "Later");
}

#[test]
fn failed_rerender_blocks_export_of_bare_panel() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = controller_with(MemoryStore::new(), Arc::new(PickyEncoder));
    c.qr_form_mut().url = "https://ok.example".into();
    c.render_qr_now();
    assert!(c.wait_for_encode(WAIT));
    assert!(c.can_export_qr());

    c.qr_form_mut().url = "https://fail.example".into();
    c.render_qr_now();
    assert!(!c.can_export_qr(), "panel-only canvas while encoding");
    assert!(c.wait_for_encode(WAIT));

    assert_eq!(c.qr_status(), RenderStatus::Failed);
    assert_eq!(c.qr_message(), Some(ENCODE_FAILED_MESSAGE));
    assert!(!c.can_export_qr());
    assert!(c.export_qr(dir.path()).is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    c.qr_form_mut().url = "https://ok.example/again".into();
    c.render_qr_now();
    assert!(c.wait_for_encode(WAIT));
    assert!(c.export_qr(dir.path()).is_ok());
}

#[test]
fn qr_too_small_for_url_is_an_input_error() {
    let mut c = controller_with(MemoryStore::new(), Arc::new(QrCodeEncoder));
    c.qr_form_mut().url = "https://example.com".into();
    c.qr_form_mut().canvas_size = 256;
    c.qr_form_mut().qr_size_percent = 5;
    c.render_qr_now();
    assert!(c.wait_for_encode(WAIT));

    assert_eq!(c.qr_input_error(), Some(QR_TOO_SMALL_MESSAGE));
    assert_eq!(c.qr_message(), None);
    assert_eq!(c.qr_status(), RenderStatus::Failed);
    assert!(!c.can_export_qr());
}

#[test]
fn invalid_url_abandons_running_encode() {
    let (encoder, gate) = GatedEncoder::new();
    let store = MemoryStore::new();
    let mut c = controller_with(store.clone(), encoder.clone());

    c.qr_form_mut().url = "https://slow.example".into();
    c.render_qr_now();
    assert!(c.is_encoding());

    c.qr_form_mut().url = "javascript:alert(1)".into();
    c.render_qr_now();
    assert!(!c.is_encoding());
    assert_eq!(c.qr_status(), RenderStatus::Idle);

    gate.send(()).unwrap();
    let deadline = Instant::now() + WAIT;
    while encoder.finished.load(Ordering::SeqCst) < 1 && Instant::now() < deadline {
        sleep(Duration::from_millis(5));
    }
    sleep(Duration::from_millis(50));
    c.tick(Instant::now());

    assert!(!c.is_qr_visible());
    assert!(!c.can_export_qr());
    assert_eq!(store.writes(), 0);
    assert_eq!(c.qr_input_error(), Some("javascript: URLs are not allowed"));
}
