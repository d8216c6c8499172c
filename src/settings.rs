//! Last-used form values, persisted under one namespaced key of a small
//! key-value store.

use crate::compose::overlay::OverlayRequest;
use crate::compose::qr::QrRequest;
use crate::compose::{parse_color, ComposeError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const SETTINGS_KEY: &str = "stream_graphics.settings";
/// Upper bound for any canvas side restored from the store.
pub const MAX_CANVAS_EDGE: u32 = 8192;
pub const MAX_FONT_SIZE: u32 = 512;

fn default_qr_canvas_size() -> u32 {
    600
}

fn default_qr_size_percent() -> u32 {
    40
}

fn default_dark() -> String {
    "#000000".into()
}

fn default_light() -> String {
    "#ffffff".into()
}

fn default_caption_font_size() -> u32 {
    16
}

fn default_overlay_background() -> String {
    "#1f2937".into()
}

fn default_overlay_font_size() -> u32 {
    24
}

fn default_overlay_padding() -> u32 {
    10
}

fn default_overlay_width() -> u32 {
    1920
}

fn default_overlay_height() -> u32 {
    1080
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default = "default_qr_canvas_size")]
    pub canvas_size: u32,
    #[serde(default = "default_qr_size_percent")]
    pub qr_size_percent: u32,
    #[serde(default = "default_dark")]
    pub foreground: String,
    #[serde(default = "default_light")]
    pub background: String,
    #[serde(default = "default_caption_font_size")]
    pub caption_font_size: u32,
    #[serde(default = "default_dark")]
    pub caption_color: String,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            caption: String::new(),
            canvas_size: default_qr_canvas_size(),
            qr_size_percent: default_qr_size_percent(),
            foreground: default_dark(),
            background: default_light(),
            caption_font_size: default_caption_font_size(),
            caption_color: default_dark(),
        }
    }
}

impl QrSettings {
    pub fn to_request(&self) -> Result<QrRequest, ComposeError> {
        Ok(QrRequest {
            url: self.url.trim().to_string(),
            caption: self.caption.trim().to_string(),
            canvas_size: self.canvas_size.min(MAX_CANVAS_EDGE),
            qr_size_percent: self.qr_size_percent.clamp(1, 100),
            foreground: parse_color("QR color", &self.foreground)?,
            background: parse_color("background color", &self.background)?,
            caption_font_size: self.caption_font_size.clamp(1, MAX_FONT_SIZE),
            caption_color: parse_color("caption color", &self.caption_color)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlaySettings {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_overlay_background")]
    pub background: String,
    #[serde(default = "default_light")]
    pub text_color: String,
    #[serde(default = "default_overlay_font_size")]
    pub font_size: u32,
    #[serde(default = "default_overlay_padding")]
    pub padding: u32,
    #[serde(default = "default_overlay_width")]
    pub canvas_width: u32,
    #[serde(default = "default_overlay_height")]
    pub canvas_height: u32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            background: default_overlay_background(),
            text_color: default_light(),
            font_size: default_overlay_font_size(),
            padding: default_overlay_padding(),
            canvas_width: default_overlay_width(),
            canvas_height: default_overlay_height(),
        }
    }
}

impl OverlaySettings {
    /// Sizes are clamped so a hand-edited store cannot request absurd canvases.
    pub fn to_request(&self) -> Result<OverlayRequest, ComposeError> {
        let canvas_width = self.canvas_width.min(MAX_CANVAS_EDGE);
        let canvas_height = self.canvas_height.min(MAX_CANVAS_EDGE);
        Ok(OverlayRequest {
            title: self.title.trim().to_string(),
            background: parse_color("background color", &self.background)?,
            text_color: parse_color("text color", &self.text_color)?,
            font_size: self.font_size.clamp(1, MAX_FONT_SIZE),
            padding: self.padding.min(canvas_width),
            canvas_width,
            canvas_height,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PersistedSettings {
    #[serde(default)]
    pub qr: QrSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
}

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

/// Keys and values kept as one JSON object on disk. The file is read once
/// when opened and rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable settings store");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read settings store {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content)
        .with_context(|| format!("deserialize settings store {}", path.display()))
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("create settings store folder {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(&self.entries).context("serialize settings store")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write settings store {}", self.path.display()))
    }
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryEntries>>,
}

#[derive(Debug, Default)]
struct MemoryEntries {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.inner.lock().map(|m| m.writes).unwrap_or(0)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let mut entries = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.values.insert(key.to_string(), value);
        entries.writes += 1;
        Ok(())
    }
}

/// Reads and writes [`PersistedSettings`] under [`SETTINGS_KEY`]. Failures are
/// logged and otherwise ignored.
pub struct SettingsStore {
    store: Box<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `None` when nothing was saved yet or the stored value is malformed.
    pub fn load(&self) -> Option<PersistedSettings> {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "failed to read saved settings");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed saved settings");
                None
            }
        }
    }

    /// Returns whether the settings were written.
    pub fn save(&mut self, settings: &PersistedSettings) -> bool {
        let result = serde_json::to_string(settings)
            .context("serialize settings")
            .and_then(|json| self.store.set(SETTINGS_KEY, json));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "failed to save settings");
                false
            }
        }
    }
}
