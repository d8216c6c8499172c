//! QR panel composition.
//!
//! The panel is drawn synchronously, the QR bitmap comes from a [`QrEncoder`]
//! (usually on a worker thread) and is composited afterwards together with the
//! optional caption.

use crate::compose::canvas::{Canvas, CornerRadii, RectF};
use crate::compose::color::Color;
use crate::compose::text::FontFace;
use crate::compose::{ComposeError, EncodeError};
use crate::validate::validate;
use image::RgbaImage;
use qrcode::{EcLevel, QrCode};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Gap around the QR bitmap inside the panel and between panel and canvas edge.
pub const PANEL_PAD: u32 = 8;
pub const PANEL_RADIUS: f32 = 8.0;
/// Caption strip height on top of the caption font size.
pub const CAPTION_EXTRA_HEIGHT: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrRequest {
    pub url: String,
    pub caption: String,
    pub canvas_size: u32,
    pub qr_size_percent: u32,
    pub foreground: Color,
    pub background: Color,
    pub caption_font_size: u32,
    pub caption_color: Color,
}

impl QrRequest {
    pub fn trimmed_caption(&self) -> &str {
        self.caption.trim()
    }
}

/// Raw edge length before clamping: `floor(canvas * percent / 100)`.
pub fn qr_edge(canvas_size: u32, qr_size_percent: u32) -> u32 {
    let percent = qr_size_percent.clamp(1, 100) as u64;
    (canvas_size as u64 * percent / 100) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrLayout {
    pub canvas_size: u32,
    pub qr_edge: u32,
    pub caption_height: u32,
    pub panel_x: u32,
    pub panel_y: u32,
    pub panel_width: u32,
    pub panel_height: u32,
}

impl QrLayout {
    /// Panel geometry anchored to the top-right corner.
    ///
    /// The QR edge is clamped so the whole panel, caption strip included,
    /// stays `PANEL_PAD` away from the canvas edges.
    pub fn compute(request: &QrRequest) -> Result<Self, ComposeError> {
        let canvas_size = request.canvas_size;
        let caption_height = if request.trimmed_caption().is_empty() {
            0
        } else {
            request.caption_font_size.saturating_add(CAPTION_EXTRA_HEIGHT)
        };
        let max_edge = canvas_size as i64 - 3 * PANEL_PAD as i64 - caption_height as i64;
        let edge = (qr_edge(canvas_size, request.qr_size_percent) as i64).min(max_edge);
        if edge <= 0 {
            return Err(ComposeError::CanvasTooSmall {
                width: canvas_size,
                height: canvas_size,
            });
        }
        let qr_edge = edge as u32;
        let panel_width = qr_edge + 2 * PANEL_PAD;
        let panel_height = qr_edge + 2 * PANEL_PAD + caption_height;
        Ok(Self {
            canvas_size,
            qr_edge,
            caption_height,
            panel_x: canvas_size - panel_width - PANEL_PAD,
            panel_y: PANEL_PAD,
            panel_width,
            panel_height,
        })
    }

    pub fn panel_rect(&self) -> RectF {
        RectF::new(
            self.panel_x as f32,
            self.panel_y as f32,
            self.panel_width as f32,
            self.panel_height as f32,
        )
    }

    pub fn qr_origin(&self) -> (u32, u32) {
        (self.panel_x + PANEL_PAD, self.panel_y + PANEL_PAD)
    }

    /// Center of the strip between the QR bitmap and the panel bottom.
    pub fn caption_center(&self) -> (f32, f32) {
        let strip_top = (self.panel_y + PANEL_PAD + self.qr_edge) as f32;
        let strip_height = (self.caption_height + PANEL_PAD) as f32;
        (
            self.panel_x as f32 + self.panel_width as f32 / 2.0,
            strip_top + strip_height / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrEncodeOptions {
    pub edge: u32,
    pub margin: u32,
    pub foreground: Color,
    pub background: Color,
}

impl QrEncodeOptions {
    pub fn for_request(request: &QrRequest, layout: &QrLayout) -> Self {
        Self {
            edge: layout.qr_edge,
            margin: 0,
            foreground: request.foreground,
            background: request.background,
        }
    }
}

/// Produces a square QR bitmap of exactly `options.edge` pixels.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, data: &str, options: &QrEncodeOptions) -> Result<RgbaImage, EncodeError>;
}

/// Encoder backed by the `qrcode` crate at error correction level M.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrCodeEncoder;

impl QrEncoder for QrCodeEncoder {
    fn encode(&self, data: &str, options: &QrEncodeOptions) -> Result<RgbaImage, EncodeError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
            .map_err(|e| EncodeError::Data(e.to_string()))?;
        let modules = code.width() as u32;
        let total = modules + 2 * options.margin;
        if options.edge < total {
            return Err(EncodeError::TooSmall {
                needed: total,
                edge: options.edge,
            });
        }
        let colors = code.to_colors();
        let mut img = RgbaImage::from_pixel(options.edge, options.edge, options.background.into());
        let foreground: image::Rgba<u8> = options.foreground.into();
        // Map each output pixel back to a module so the bitmap fills the edge exactly.
        for y in 0..options.edge {
            let my = y * total / options.edge;
            for x in 0..options.edge {
                let mx = x * total / options.edge;
                let inside = (options.margin..options.margin + modules).contains(&mx)
                    && (options.margin..options.margin + modules).contains(&my);
                if !inside {
                    continue;
                }
                let idx = ((my - options.margin) * modules + (mx - options.margin)) as usize;
                if colors[idx] == qrcode::Color::Dark {
                    img.put_pixel(x, y, foreground);
                }
            }
        }
        Ok(img)
    }
}

/// Resize the canvas and draw the empty panel. Nothing is touched when the
/// request is rejected.
pub fn begin(canvas: &mut Canvas, request: &QrRequest) -> Result<QrLayout, ComposeError> {
    let verdict = validate(&request.url);
    if !verdict.accepted {
        return Err(ComposeError::InvalidUrl(verdict.reason));
    }
    let layout = QrLayout::compute(request)?;
    canvas.resize(layout.canvas_size, layout.canvas_size);
    canvas.fill_rounded_rect(
        layout.panel_rect(),
        CornerRadii::uniform(PANEL_RADIUS),
        request.background,
    );
    Ok(layout)
}

/// Composite the encoded bitmap and the caption into the prepared panel.
pub fn finish(
    canvas: &mut Canvas,
    request: &QrRequest,
    layout: &QrLayout,
    bitmap: &RgbaImage,
    font: &FontFace,
) {
    let (x, y) = layout.qr_origin();
    canvas.draw_image(bitmap, x as i32, y as i32);

    let caption = request.trimmed_caption();
    if !caption.is_empty() {
        canvas.draw_text_centered(
            font,
            caption,
            request.caption_font_size as f32,
            layout.caption_center(),
            request.caption_color,
        );
    }
}

/// Blocking render: panel, encode, composite.
pub fn render_qr(
    canvas: &mut Canvas,
    request: &QrRequest,
    encoder: &dyn QrEncoder,
    font: &FontFace,
) -> Result<QrLayout, ComposeError> {
    let layout = begin(canvas, request)?;
    let bitmap = encoder.encode(
        request.url.trim(),
        &QrEncodeOptions::for_request(request, &layout),
    )?;
    finish(canvas, request, &layout, &bitmap, font);
    Ok(layout)
}

#[derive(Debug)]
pub struct EncodeOutcome {
    pub seq: u64,
    pub result: Result<RgbaImage, EncodeError>,
}

/// Run the encoder on a worker thread and post the tagged result to `tx`.
pub fn spawn_encode(
    encoder: Arc<dyn QrEncoder>,
    seq: u64,
    data: String,
    options: QrEncodeOptions,
    tx: Sender<EncodeOutcome>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("qr-encode".into())
        .spawn(move || {
            let result = encoder.encode(&data, &options);
            if tx.send(EncodeOutcome { seq, result }).is_err() {
                tracing::debug!(seq, "QR encode finished after the receiver went away");
            }
        })
        .map(|_| ())
}
