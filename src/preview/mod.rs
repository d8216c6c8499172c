pub mod controller;
pub mod debounce;

pub use controller::{InputTier, PreviewContext, PreviewController, RenderStatus};
pub use debounce::Debouncer;
