use ab_glyph::{point, Font, FontArc, FontRef, FontVec, GlyphId, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use std::path::Path;

/// A font used to measure and rasterize titles and captions.
///
/// The built-in egui face has no bold weight, so it is emboldened by
/// smearing the glyph coverage horizontally. Fonts loaded from a file are
/// drawn as-is.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
    synthetic_bold: bool,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("synthetic_bold", &self.synthetic_bold)
            .finish_non_exhaustive()
    }
}

/// Coverage mask for one line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    pub width: u32,
    pub height: u32,
    /// Distance from the mask's left edge to the start of the text advance.
    pub origin_x: f32,
    /// Distance from the mask's top edge to the baseline.
    pub baseline_y: f32,
    pub coverage: Vec<f32>,
}

impl TextMask {
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.coverage[(y * self.width + x) as usize]
    }
}

impl FontFace {
    pub fn new(font: FontArc, synthetic_bold: bool) -> Self {
        Self {
            font,
            synthetic_bold,
        }
    }

    /// The proportional face bundled with egui.
    pub fn builtin() -> Option<Self> {
        let definitions = egui::FontDefinitions::default();
        let family = definitions.families.get(&egui::FontFamily::Proportional)?;
        let font_name = family.first()?;
        let data = definitions.font_data.get(font_name)?.clone();
        let font = match data.font {
            std::borrow::Cow::Borrowed(bytes) => FontRef::try_from_slice_and_index(bytes, data.index)
                .map(FontArc::from)
                .ok(),
            std::borrow::Cow::Owned(bytes) => FontVec::try_from_vec_and_index(bytes, data.index)
                .map(FontArc::from)
                .ok(),
        }?;
        Some(Self::new(font, true))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font file {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("parse font file {}", path.display()))?;
        Ok(Self::new(FontArc::from(font), false))
    }

    /// Configured font when given, otherwise the built-in face.
    pub fn load(font_path: Option<&Path>) -> Result<Self> {
        match font_path {
            Some(path) => Self::from_file(path),
            None => Self::builtin().ok_or_else(|| anyhow!("built-in font is unavailable")),
        }
    }

    fn scale(size: f32) -> PxScale {
        PxScale::from(size.max(1.0))
    }

    fn embolden_px(&self, size: f32) -> f32 {
        if self.synthetic_bold {
            (size / 24.0).max(1.0)
        } else {
            0.0
        }
    }

    /// Ascent (positive, above baseline) and descent (negative) at `size` px.
    pub fn vertical_metrics(&self, size: f32) -> (f32, f32) {
        let scaled = self.font.as_scaled(Self::scale(size));
        (scaled.ascent(), scaled.descent())
    }

    /// Rendered advance width of `text` at `size` px, bold weight.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let scaled = self.font.as_scaled(Self::scale(size));
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width + self.embolden_px(size)
    }

    /// Rasterize `text` into a standalone coverage mask.
    pub fn rasterize(&self, text: &str, size: f32) -> TextMask {
        let scaled = self.font.as_scaled(Self::scale(size));
        let pad = (size * 0.25).ceil().max(2.0);
        let (ascent, descent) = (scaled.ascent(), scaled.descent());
        let width = (self.measure(text, size) + pad * 2.0).ceil().max(1.0) as u32;
        let height = (ascent - descent + pad * 2.0).ceil().max(1.0) as u32;
        let mut mask = TextMask {
            width,
            height,
            origin_x: pad,
            baseline_y: pad + ascent,
            coverage: vec![0.0; (width * height) as usize],
        };

        let embolden = self.embolden_px(size);
        let steps = (embolden * 2.0).ceil() as u32;
        for step in 0..=steps {
            let offset = if steps == 0 {
                0.0
            } else {
                embolden * step as f32 / steps as f32
            };
            let mut caret = point(mask.origin_x + offset, mask.baseline_y);
            let mut prev: Option<GlyphId> = None;
            for ch in text.chars() {
                let mut glyph = scaled.scaled_glyph(ch);
                if let Some(prev) = prev {
                    caret.x += scaled.kern(prev, glyph.id);
                }
                glyph.position = caret;
                caret.x += scaled.h_advance(glyph.id);
                prev = Some(glyph.id);
                let Some(outlined) = scaled.outline_glyph(glyph) else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|x, y, c| {
                    let px = x as i32 + bounds.min.x as i32;
                    let py = y as i32 + bounds.min.y as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        return;
                    }
                    let idx = (py as u32 * width + px as u32) as usize;
                    mask.coverage[idx] = mask.coverage[idx].max(c.clamp(0.0, 1.0));
                });
            }
        }
        mask
    }
}
