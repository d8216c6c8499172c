use crate::compose::overlay::render_overlay;
use crate::compose::qr::{self, spawn_encode, EncodeOutcome, QrEncodeOptions, QrEncoder, QrLayout, QrRequest};
use crate::compose::save::{export_canvas, ExportKind};
use crate::compose::{Canvas, ComposeError, EncodeError, FontFace};
use crate::preview::debounce::Debouncer;
use crate::settings::{KeyValueStore, PersistedSettings, SettingsStore};
use crate::validate::validate;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ENCODE_FAILED_MESSAGE: &str = "Failed to generate QR code. Please try again.";
pub const MISSING_URL_MESSAGE: &str = "Please enter a URL";
pub const MISSING_TITLE_MESSAGE: &str = "Please enter an event title";
pub const QR_TOO_SMALL_MESSAGE: &str =
    "QR size is too small for this URL. Increase the QR size or the canvas size.";

/// How often the UI should poll while a QR encode is running.
const ENCODE_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Everything the controller needs, handed over once at construction.
pub struct PreviewContext {
    pub store: Box<dyn KeyValueStore>,
    pub encoder: Arc<dyn QrEncoder>,
    pub font: FontFace,
    /// Text and numeric fields.
    pub fast_debounce: Duration,
    /// Color pickers, which emit a burst of events while dragging.
    pub slow_debounce: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTier {
    Fast,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStatus {
    #[default]
    Idle,
    /// Panel drawn, waiting for the QR bitmap.
    Encoding,
    Rendered,
    Failed,
}

#[derive(Debug)]
struct PendingEncode {
    seq: u64,
    request: QrRequest,
    layout: QrLayout,
}

#[derive(Debug)]
struct PreviewPane {
    canvas: Canvas,
    debounce: Debouncer,
    /// Shown next to the offending field.
    input_error: Option<String>,
    /// Shown in the message area.
    message: Option<String>,
    visible: bool,
    status: RenderStatus,
    revision: u64,
}

impl PreviewPane {
    fn new(delay: Duration) -> Self {
        Self {
            canvas: Canvas::default(),
            debounce: Debouncer::new(delay),
            input_error: None,
            message: None,
            visible: false,
            status: RenderStatus::Idle,
            revision: 0,
        }
    }

    fn report(&mut self, err: ComposeError) {
        if err.is_input_error() {
            self.input_error = Some(err.to_string());
        } else {
            self.message = Some(err.to_string());
            self.status = RenderStatus::Failed;
        }
    }
}

/// Keeps both previews in sync with their forms.
///
/// Input events schedule a debounced render; [`tick`](Self::tick) must be
/// called regularly (once per UI frame) to fire due renders and collect QR
/// bitmaps from the encode worker.
pub struct PreviewController {
    settings: PersistedSettings,
    store: SettingsStore,
    encoder: Arc<dyn QrEncoder>,
    font: FontFace,
    fast_debounce: Duration,
    slow_debounce: Duration,
    qr: PreviewPane,
    overlay: PreviewPane,
    in_flight: Option<PendingEncode>,
    last_seq: u64,
    encode_tx: Sender<EncodeOutcome>,
    encode_rx: Receiver<EncodeOutcome>,
}

impl PreviewController {
    pub fn new(ctx: PreviewContext) -> Self {
        let store = SettingsStore::new(ctx.store);
        let settings = store.load().unwrap_or_default();
        let (encode_tx, encode_rx) = mpsc::channel();
        Self {
            settings,
            store,
            encoder: ctx.encoder,
            font: ctx.font,
            fast_debounce: ctx.fast_debounce,
            slow_debounce: ctx.slow_debounce,
            qr: PreviewPane::new(ctx.fast_debounce),
            overlay: PreviewPane::new(ctx.fast_debounce),
            in_flight: None,
            last_seq: 0,
            encode_tx,
            encode_rx,
        }
    }

    pub fn settings(&self) -> &PersistedSettings {
        &self.settings
    }

    pub fn qr_form_mut(&mut self) -> &mut crate::settings::QrSettings {
        &mut self.settings.qr
    }

    pub fn overlay_form_mut(&mut self) -> &mut crate::settings::OverlaySettings {
        &mut self.settings.overlay
    }

    fn delay_for(&self, tier: InputTier) -> Duration {
        match tier {
            InputTier::Fast => self.fast_debounce,
            InputTier::Slow => self.slow_debounce,
        }
    }

    /// A QR form field changed.
    pub fn on_qr_input(&mut self, tier: InputTier, now: Instant) {
        let delay = self.delay_for(tier);
        self.qr.debounce.trigger_with_delay(now, delay);
        // Inline validation runs on every keystroke; rendering waits.
        let verdict = validate(&self.settings.qr.url);
        self.qr.input_error = (!verdict.reason.is_empty()).then_some(verdict.reason);
    }

    /// An overlay form field changed.
    pub fn on_overlay_input(&mut self, tier: InputTier, now: Instant) {
        let delay = self.delay_for(tier);
        self.overlay.debounce.trigger_with_delay(now, delay);
    }

    /// Fire due renders and apply finished encodes.
    pub fn tick(&mut self, now: Instant) {
        if self.qr.debounce.poll(now) {
            self.render_qr(false);
        }
        if self.overlay.debounce.poll(now) {
            self.render_overlay(false);
        }
        self.drain_encodes();
    }

    /// How long the UI may sleep before the next `tick` is useful.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        let encode = self.in_flight.as_ref().map(|_| ENCODE_POLL_INTERVAL);
        [
            self.qr.debounce.remaining(now),
            self.overlay.debounce.remaining(now),
            encode,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Render the QR preview immediately (the "Generate" button).
    pub fn render_qr_now(&mut self) {
        self.qr.debounce.cancel();
        self.render_qr(true);
    }

    pub fn render_overlay_now(&mut self) {
        self.overlay.debounce.cancel();
        self.render_overlay(true);
    }

    fn render_qr(&mut self, manual: bool) {
        let verdict = validate(&self.settings.qr.url);
        if !verdict.accepted {
            self.qr.input_error = if verdict.is_empty_input() {
                manual.then(|| MISSING_URL_MESSAGE.to_string())
            } else {
                Some(verdict.reason)
            };
            self.abandon_encode();
            return;
        }
        let request = match self.settings.qr.to_request() {
            Ok(request) => request,
            Err(e) => {
                self.abandon_encode();
                return self.qr.report(e);
            }
        };
        self.qr.input_error = None;

        let layout = match qr::begin(&mut self.qr.canvas, &request) {
            Ok(layout) => layout,
            Err(e) => {
                self.abandon_encode();
                return self.qr.report(e);
            }
        };
        self.qr.message = None;
        self.qr.revision += 1;

        self.last_seq += 1;
        let seq = self.last_seq;
        let options = QrEncodeOptions::for_request(&request, &layout);
        let spawned = spawn_encode(
            Arc::clone(&self.encoder),
            seq,
            request.url.clone(),
            options,
            self.encode_tx.clone(),
        );
        match spawned {
            Ok(()) => {
                tracing::debug!(seq, edge = layout.qr_edge, "QR encode started");
                self.qr.status = RenderStatus::Encoding;
                self.in_flight = Some(PendingEncode {
                    seq,
                    request,
                    layout,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start QR encode worker");
                self.qr.message = Some(ENCODE_FAILED_MESSAGE.to_string());
                self.qr.status = RenderStatus::Failed;
                self.in_flight = None;
            }
        }
    }

    /// Forget the running encode so its result is never applied. The canvas
    /// then holds only the panel, so it is no longer exportable.
    fn abandon_encode(&mut self) {
        if let Some(pending) = self.in_flight.take() {
            tracing::debug!(seq = pending.seq, "abandoning QR encode for rejected input");
            self.qr.status = RenderStatus::Idle;
        }
    }

    fn drain_encodes(&mut self) {
        loop {
            match self.encode_rx.try_recv() {
                Ok(outcome) => {
                    self.apply_encode(outcome);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Returns whether the outcome belonged to the latest request.
    fn apply_encode(&mut self, outcome: EncodeOutcome) -> bool {
        let current = matches!(&self.in_flight, Some(p) if p.seq == outcome.seq);
        if !current {
            tracing::debug!(seq = outcome.seq, latest = self.last_seq, "discarding stale QR encode");
            return false;
        }
        let Some(pending) = self.in_flight.take() else {
            return false;
        };
        match outcome.result {
            Ok(bitmap) => {
                qr::finish(
                    &mut self.qr.canvas,
                    &pending.request,
                    &pending.layout,
                    &bitmap,
                    &self.font,
                );
                self.qr.visible = true;
                self.qr.status = RenderStatus::Rendered;
                self.qr.revision += 1;
                self.persist();
            }
            Err(EncodeError::TooSmall { needed, edge }) => {
                tracing::debug!(needed, edge, "QR edge below module count");
                self.qr.input_error = Some(QR_TOO_SMALL_MESSAGE.to_string());
                self.qr.status = RenderStatus::Failed;
            }
            Err(e) => {
                tracing::warn!(seq = pending.seq, error = %e, "QR encode failed");
                self.qr.message = Some(ENCODE_FAILED_MESSAGE.to_string());
                self.qr.status = RenderStatus::Failed;
            }
        }
        true
    }

    /// Block until the latest QR encode has been applied or `timeout` passes.
    /// Returns true when it was applied.
    pub fn wait_for_encode(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.encode_rx.recv_timeout(left) {
                Ok(outcome) => {
                    if self.apply_encode(outcome) {
                        return true;
                    }
                }
                Err(_) => return false,
            }
        }
        false
    }

    fn render_overlay(&mut self, manual: bool) {
        if self.settings.overlay.title.trim().is_empty() {
            self.overlay.input_error = manual.then(|| MISSING_TITLE_MESSAGE.to_string());
            return;
        }
        let request = match self.settings.overlay.to_request() {
            Ok(request) => request,
            Err(e) => return self.overlay.report(e),
        };
        match render_overlay(&mut self.overlay.canvas, &request, &self.font) {
            Ok(_) => {
                self.overlay.input_error = None;
                self.overlay.message = None;
                self.overlay.visible = true;
                self.overlay.status = RenderStatus::Rendered;
                self.overlay.revision += 1;
                self.persist();
            }
            Err(e) => self.overlay.report(e),
        }
    }

    fn persist(&mut self) {
        if !self.store.save(&self.settings) {
            tracing::debug!("settings not persisted this cycle");
        }
    }

    /// True only while the QR canvas holds a completed render.
    pub fn can_export_qr(&self) -> bool {
        self.qr.visible && self.qr.status == RenderStatus::Rendered
    }

    pub fn export_qr(&self, dir: &Path) -> Result<PathBuf> {
        if !self.can_export_qr() {
            return Err(anyhow!("generate the QR code before downloading"));
        }
        export_canvas(&self.qr.canvas, ExportKind::QrCode, &self.settings.qr.caption, dir)
    }

    pub fn export_overlay(&self, dir: &Path) -> Result<PathBuf> {
        if !self.overlay.visible {
            return Err(anyhow!("generate the overlay before downloading"));
        }
        export_canvas(
            &self.overlay.canvas,
            ExportKind::Overlay,
            &self.settings.overlay.title,
            dir,
        )
    }

    /// Cancel pending work and save the current form values.
    pub fn shutdown(&mut self) {
        self.qr.debounce.cancel();
        self.overlay.debounce.cancel();
        self.in_flight = None;
        self.persist();
    }

    pub fn qr_canvas(&self) -> &Canvas {
        &self.qr.canvas
    }

    pub fn overlay_canvas(&self) -> &Canvas {
        &self.overlay.canvas
    }

    pub fn qr_input_error(&self) -> Option<&str> {
        self.qr.input_error.as_deref()
    }

    pub fn qr_message(&self) -> Option<&str> {
        self.qr.message.as_deref()
    }

    pub fn overlay_input_error(&self) -> Option<&str> {
        self.overlay.input_error.as_deref()
    }

    pub fn overlay_message(&self) -> Option<&str> {
        self.overlay.message.as_deref()
    }

    pub fn is_qr_visible(&self) -> bool {
        self.qr.visible
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay.visible
    }

    pub fn qr_status(&self) -> RenderStatus {
        self.qr.status
    }

    pub fn overlay_status(&self) -> RenderStatus {
        self.overlay.status
    }

    /// Bumped every time the QR canvas changes.
    pub fn qr_revision(&self) -> u64 {
        self.qr.revision
    }

    pub fn overlay_revision(&self) -> u64 {
        self.overlay.revision
    }

    pub fn is_encoding(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{InputTier, PreviewContext, PreviewController, MISSING_TITLE_MESSAGE, MISSING_URL_MESSAGE};
    use crate::compose::qr::QrCodeEncoder;
    use crate::compose::FontFace;
    use crate::settings::MemoryStore;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn controller(store: MemoryStore) -> PreviewController {
        PreviewController::new(PreviewContext {
            store: Box::new(store),
            encoder: Arc::new(QrCodeEncoder),
            font: FontFace::builtin().expect("font"),
            fast_debounce: Duration::from_millis(300),
            slow_debounce: Duration::from_millis(500),
        })
    }

    #[test]
    fn color_inputs_wait_for_slow_tier() {
        let mut c = controller(MemoryStore::new());
        c.overlay_form_mut().title = "Live".into();
        let start = Instant::now();
        c.on_overlay_input(InputTier::Slow, start);
        c.tick(start + Duration::from_millis(300));
        assert!(!c.is_overlay_visible());
        c.tick(start + Duration::from_millis(500));
        assert!(c.is_overlay_visible());
    }

    #[test]
    fn debounced_render_with_blank_fields_is_silent() {
        let mut c = controller(MemoryStore::new());
        let start = Instant::now();
        c.on_qr_input(InputTier::Fast, start);
        c.on_overlay_input(InputTier::Fast, start);
        c.tick(start + Duration::from_secs(1));
        assert_eq!(c.qr_input_error(), None);
        assert_eq!(c.overlay_input_error(), None);
        assert!(!c.is_encoding());
    }

    #[test]
    fn manual_render_with_blank_fields_explains_why() {
        let mut c = controller(MemoryStore::new());
        c.render_qr_now();
        c.render_overlay_now();
        assert_eq!(c.qr_input_error(), Some(MISSING_URL_MESSAGE));
        assert_eq!(c.overlay_input_error(), Some(MISSING_TITLE_MESSAGE));
    }

    #[test]
    fn next_wakeup_tracks_earliest_deadline() {
        let mut c = controller(MemoryStore::new());
        let start = Instant::now();
        assert_eq!(c.next_wakeup(start), None);
        c.on_overlay_input(InputTier::Slow, start);
        c.on_qr_input(InputTier::Fast, start);
        assert_eq!(c.next_wakeup(start), Some(Duration::from_millis(300)));
    }
}
