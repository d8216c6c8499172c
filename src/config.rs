use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "stream_graphics.json";
pub const STORE_FILE_NAME: &str = "stream_graphics_store.json";
pub const EXPORT_SUBDIR: &str = "exports";

fn default_fast_debounce_ms() -> u64 {
    300
}

fn default_slow_debounce_ms() -> u64 {
    500
}

/// Application configuration read once at startup.
///
/// Every field has a default so a partial (or missing) file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Font used for titles and captions. The built-in UI font is used when unset.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default = "default_fast_debounce_ms")]
    pub fast_debounce_ms: u64,
    #[serde(default = "default_slow_debounce_ms")]
    pub slow_debounce_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            font_path: None,
            store_path: None,
            export_dir: None,
            fast_debounce_ms: default_fast_debounce_ms(),
            slow_debounce_ms: default_slow_debounce_ms(),
        }
    }
}

impl AppConfig {
    /// Load the config file that sits next to the executable.
    pub fn load() -> Result<Self> {
        let exe_path = std::env::current_exe().context("resolve current executable")?;
        let base = exe_dir(&exe_path)?;
        Self::load_from_path(&base.join(CONFIG_FILE_NAME))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("deserialize config file {}", path.display()))
    }

    pub fn fast_debounce(&self) -> Duration {
        Duration::from_millis(self.fast_debounce_ms)
    }

    pub fn slow_debounce(&self) -> Duration {
        Duration::from_millis(self.slow_debounce_ms)
    }

    /// Key-value store location, relative paths resolved against `base`.
    pub fn resolve_store_path(&self, base: &Path) -> PathBuf {
        resolve(base, self.store_path.as_deref(), STORE_FILE_NAME)
    }

    pub fn resolve_export_dir(&self, base: &Path) -> PathBuf {
        resolve(base, self.export_dir.as_deref(), EXPORT_SUBDIR)
    }
}

fn resolve(base: &Path, configured: Option<&Path>, fallback: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base.join(path),
        None => base.join(fallback),
    }
}

pub fn exe_dir(exe_path: &Path) -> Result<PathBuf> {
    exe_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))
}

#[cfg(test)]
mod tests {
    use super::{exe_dir, AppConfig, CONFIG_FILE_NAME, EXPORT_SUBDIR, STORE_FILE_NAME};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = AppConfig::load_from_path(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.fast_debounce(), Duration::from_millis(300));
        assert_eq!(cfg.slow_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"debug_logging": true, "slow_debounce_ms": 800}"#)
            .expect("write config");
        let cfg = AppConfig::load_from_path(&path).expect("load");
        assert!(cfg.debug_logging);
        assert_eq!(cfg.slow_debounce_ms, 800);
        assert_eq!(cfg.fast_debounce_ms, 300);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{not json").expect("write config");
        assert!(AppConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/opt/app");
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.resolve_store_path(base), base.join(STORE_FILE_NAME));
        assert_eq!(cfg.resolve_export_dir(base), base.join(EXPORT_SUBDIR));

        cfg.export_dir = Some(PathBuf::from("renders"));
        assert_eq!(cfg.resolve_export_dir(base), base.join("renders"));
    }

    #[test]
    fn exe_dir_is_parent_of_executable() {
        let exe = Path::new("/tmp/myapp/bin/stream_graphics");
        assert_eq!(exe_dir(exe).expect("dir"), Path::new("/tmp/myapp/bin"));
    }
}
