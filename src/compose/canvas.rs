use crate::compose::color::Color;
use crate::compose::text::{FontFace, TextMask};
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerRadii {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadii {
    pub const fn uniform(r: f32) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    /// Square top corners, rounded bottom corners.
    pub const fn bottom(r: f32) -> Self {
        Self {
            top_left: 0.0,
            top_right: 0.0,
            bottom_right: r,
            bottom_left: r,
        }
    }

    /// Limit every radius to half of the rectangle's shorter side.
    pub fn clamped_to(self, rect: RectF) -> Self {
        let max = (rect.width.min(rect.height) / 2.0).max(0.0);
        Self {
            top_left: self.top_left.clamp(0.0, max),
            top_right: self.top_right.clamp(0.0, max),
            bottom_right: self.bottom_right.clamp(0.0, max),
            bottom_left: self.bottom_left.clamp(0.0, max),
        }
    }
}

/// RGBA drawing surface. Resizing discards the previous contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    image: RgbaImage,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Reset to a transparent `width x height` surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let [r, g, b, a] = self.image.get_pixel(x, y).0;
        Color::rgba(r, g, b, a)
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == 0)
    }

    fn blend(&mut self, x: u32, y: u32, color: Color, coverage: f32) {
        if coverage <= 0.0 || color.a == 0 {
            return;
        }
        let alpha = (color.a as f32 * coverage.min(1.0)).round() as u8;
        let dst = self.pixel(x, y);
        let out = blend_pixel(dst, color.with_alpha(alpha));
        self.image.put_pixel(x, y, out.into());
    }

    pub fn fill_rounded_rect(&mut self, rect: RectF, radii: CornerRadii, color: Color) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let radii = radii.clamped_to(rect);
        let min_x = rect.x.floor().max(0.0) as u32;
        let min_y = rect.y.floor().max(0.0) as u32;
        let max_x = (rect.right().ceil().max(0.0) as u32).min(self.width());
        let max_y = (rect.bottom().ceil().max(0.0) as u32).min(self.height());
        for y in min_y..max_y {
            for x in min_x..max_x {
                let coverage = rounded_rect_coverage(rect, radii, x as f32 + 0.5, y as f32 + 0.5);
                self.blend(x, y, color, coverage);
            }
        }
    }

    /// Composite `src` with its top-left corner at `(x, y)`, clipped to the canvas.
    pub fn draw_image(&mut self, src: &RgbaImage, x: i32, y: i32) {
        for (sx, sy, px) in src.enumerate_pixels() {
            let dx = x + sx as i32;
            let dy = y + sy as i32;
            if dx < 0 || dy < 0 || dx >= self.width() as i32 || dy >= self.height() as i32 {
                continue;
            }
            let [r, g, b, a] = px.0;
            self.blend(dx as u32, dy as u32, Color::rgba(r, g, b, a), 1.0);
        }
    }

    fn draw_mask(&mut self, mask: &TextMask, left: i32, top: i32, color: Color) {
        for my in 0..mask.height {
            for mx in 0..mask.width {
                let coverage = mask.at(mx, my);
                if coverage <= 0.0 {
                    continue;
                }
                let dx = left + mx as i32;
                let dy = top + my as i32;
                if dx < 0 || dy < 0 || dx >= self.width() as i32 || dy >= self.height() as i32 {
                    continue;
                }
                self.blend(dx as u32, dy as u32, color, coverage);
            }
        }
    }

    /// Draw one line of text centered on `(cx, cy)` in both axes.
    ///
    /// Vertical centering uses the middle of the font's ascent/descent box.
    pub fn draw_text_centered(
        &mut self,
        face: &FontFace,
        text: &str,
        size: f32,
        (cx, cy): (f32, f32),
        color: Color,
    ) {
        if text.is_empty() {
            return;
        }
        let width = face.measure(text, size);
        let (ascent, descent) = face.vertical_metrics(size);
        let baseline = cy + (ascent + descent) / 2.0;
        let mask = face.rasterize(text, size);
        let left = (cx - width / 2.0 - mask.origin_x).round() as i32;
        let top = (baseline - mask.baseline_y).round() as i32;
        self.draw_mask(&mask, left, top, color);
    }
}

fn rounded_rect_coverage(rect: RectF, radii: CornerRadii, px: f32, py: f32) -> f32 {
    let edge = (px - rect.x)
        .min(rect.right() - px)
        .min(py - rect.y)
        .min(rect.bottom() - py);
    let mut coverage = (edge + 0.5).clamp(0.0, 1.0);

    let corners = [
        (radii.top_left, false, false),
        (radii.top_right, true, false),
        (radii.bottom_right, true, true),
        (radii.bottom_left, false, true),
    ];
    for (radius, right_side, bottom_side) in corners {
        if radius <= 0.0 {
            continue;
        }
        let cx = if right_side { rect.right() - radius } else { rect.x + radius };
        let cy = if bottom_side { rect.bottom() - radius } else { rect.y + radius };
        let in_x = if right_side { px > cx } else { px < cx };
        let in_y = if bottom_side { py > cy } else { py < cy };
        if in_x && in_y {
            let dist = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            coverage = coverage.min((radius - dist + 0.5).clamp(0.0, 1.0));
        }
    }
    coverage
}

fn blend_pixel(bottom: Color, top: Color) -> Color {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Color::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Color {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}
