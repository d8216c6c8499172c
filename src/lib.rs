pub mod common;
pub mod compose;
pub mod config;
pub mod gui;
pub mod logging;
pub mod preview;
pub mod settings;
pub mod validate;
