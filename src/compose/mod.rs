pub mod canvas;
pub mod color;
pub mod overlay;
pub mod qr;
pub mod save;
pub mod text;

pub use canvas::{Canvas, CornerRadii, RectF};
pub use color::Color;
pub use text::FontFace;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("QR encoder rejected the data: {0}")]
    Data(String),
    #[error("QR code needs at least {needed}px but only {edge}px are available")]
    TooSmall { needed: u32, edge: u32 },
    #[error("QR encode worker stopped before returning a result")]
    WorkerLost,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("title is empty")]
    EmptyTitle,
    #[error("{0}")]
    InvalidUrl(String),
    #[error("{field} is not a valid color: {value:?}")]
    InvalidColor { field: &'static str, value: String },
    #[error("canvas of {width}x{height}px is too small for this layout")]
    CanvasTooSmall { width: u32, height: u32 },
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl ComposeError {
    /// Input errors are shown next to the offending field; the rest go to the
    /// message area.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyTitle
                | Self::InvalidUrl(_)
                | Self::InvalidColor { .. }
                | Self::Encode(EncodeError::TooSmall { .. })
        )
    }
}

/// Parse a form color value, naming the field on failure.
pub fn parse_color(field: &'static str, value: &str) -> Result<Color, ComposeError> {
    Color::from_hex(value).ok_or_else(|| ComposeError::InvalidColor {
        field,
        value: value.to_string(),
    })
}
