use crate::common::filename::export_filename;
use crate::compose::canvas::Canvas;
use anyhow::{anyhow, Context, Result};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    QrCode,
    Overlay,
}

impl ExportKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::QrCode => "qrcode",
            Self::Overlay => "overlay",
        }
    }

    /// Base name used when the title is blank.
    pub fn fallback_stem(self) -> &'static str {
        self.tag()
    }

    pub fn filename(self, title: &str) -> String {
        export_filename(title, self.fallback_stem(), self.tag())
    }
}

pub fn encode_png(canvas: &Canvas) -> Result<Vec<u8>> {
    if canvas.width() == 0 || canvas.height() == 0 {
        return Err(anyhow!("nothing has been rendered yet"));
    }
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            canvas.image().as_raw(),
            canvas.width(),
            canvas.height(),
            ColorType::Rgba8,
        )
        .context("encode canvas as PNG")?;
    Ok(bytes)
}

pub fn ensure_output_folder(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create export folder {}", dir.display()))
}

/// Write the canvas as `<sanitized title>_<tag>.png` inside `dir`.
pub fn export_canvas(canvas: &Canvas, kind: ExportKind, title: &str, dir: &Path) -> Result<PathBuf> {
    let bytes = encode_png(canvas)?;
    ensure_output_folder(dir)?;
    let path = dir.join(kind.filename(title));
    fs::write(&path, bytes).with_context(|| format!("write export {}", path.display()))?;
    tracing::info!(path = %path.display(), "exported {}", kind.tag());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{encode_png, export_canvas, ExportKind};
    use crate::compose::canvas::{Canvas, CornerRadii, RectF};
    use crate::compose::color::Color;

    #[test]
    fn filenames_follow_kind_contract() {
        assert_eq!(ExportKind::QrCode.filename(""), "qrcode_qrcode.png");
        assert_eq!(ExportKind::Overlay.filename(""), "overlay_overlay.png");
        assert_eq!(
            ExportKind::QrCode.filename("My Event! 2024"),
            "My_Event_2024_qrcode.png"
        );
    }

    #[test]
    fn empty_canvas_cannot_be_exported() {
        assert!(encode_png(&Canvas::default()).is_err());
    }

    #[test]
    fn export_writes_decodable_png() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut canvas = Canvas::new(6, 4);
        canvas.fill_rounded_rect(
            RectF::new(0.0, 0.0, 6.0, 4.0),
            CornerRadii::default(),
            Color::rgb(9, 8, 7),
        );
        let out_dir = dir.path().join("nested");
        let path = export_canvas(&canvas, ExportKind::Overlay, "Live Now", &out_dir)
            .expect("export");
        assert!(path.ends_with("Live_Now_overlay.png"));

        let decoded = image::open(&path).expect("decode").to_rgba8();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.get_pixel(2, 2).0, [9, 8, 7, 255]);
    }
}
