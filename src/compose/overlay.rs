use crate::compose::canvas::{Canvas, CornerRadii, RectF};
use crate::compose::color::Color;
use crate::compose::text::FontFace;
use crate::compose::ComposeError;

pub const BAR_CORNER_RADIUS: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRequest {
    pub title: String,
    pub background: Color,
    pub text_color: Color,
    pub font_size: u32,
    pub padding: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    pub text_width: f32,
    pub bar: RectF,
    /// True when the bar would have been taller than the canvas.
    pub height_clamped: bool,
}

impl OverlayLayout {
    /// Title bar geometry: text-driven width capped at the canvas width,
    /// centered horizontally and flush with the top edge.
    pub fn compute(request: &OverlayRequest, text_width: f32) -> Self {
        let canvas_width = request.canvas_width as f32;
        let natural_height = request.font_size as f32 + 2.0 * request.padding as f32;
        let bar_height = natural_height.min(request.canvas_height as f32);
        let bar_width = (text_width + 4.0 * request.padding as f32).min(canvas_width);
        let bar_x = (canvas_width - bar_width) / 2.0;
        Self {
            text_width,
            bar: RectF::new(bar_x, 0.0, bar_width, bar_height),
            height_clamped: natural_height > bar_height,
        }
    }
}

/// Draw the title bar overlay. An empty title leaves the canvas untouched.
pub fn render_overlay(
    canvas: &mut Canvas,
    request: &OverlayRequest,
    font: &FontFace,
) -> Result<OverlayLayout, ComposeError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ComposeError::EmptyTitle);
    }
    if request.canvas_width == 0 || request.canvas_height == 0 {
        return Err(ComposeError::CanvasTooSmall {
            width: request.canvas_width,
            height: request.canvas_height,
        });
    }

    canvas.resize(request.canvas_width, request.canvas_height);
    let size = request.font_size as f32;
    let layout = OverlayLayout::compute(request, font.measure(title, size));
    if layout.height_clamped {
        tracing::debug!(
            font_size = request.font_size,
            padding = request.padding,
            canvas_height = request.canvas_height,
            "title bar clamped to canvas height"
        );
    }

    canvas.fill_rounded_rect(
        layout.bar,
        CornerRadii::bottom(BAR_CORNER_RADIUS),
        request.background,
    );
    canvas.draw_text_centered(font, title, size, layout.bar.center(), request.text_color);
    Ok(layout)
}
