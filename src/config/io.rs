//! Configuration file I/O operations

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

impl Config {
    /// Get the global config directory path (~/.jetctl/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jetctl")
    }

    /// Get the global config file path (~/.jetctl/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` if given, else the global config.
    ///
    /// A missing global config yields the defaults; a missing explicit path is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let global_path = Self::global_config_path();
        if !global_path.exists() {
            tracing::debug!(
                "No config at {}, using defaults",
                global_path.display()
            );
            return Ok(Self::with_defaults());
        }
        Self::from_file(&global_path)
    }

    /// Serialize and store this configuration at `path`
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        Self::write_locked(path, &content)
    }

    /// Replace the file at `path` with `content`.
    ///
    /// Writers serialize on a sibling `.lock` file. The content goes to a
    /// synced temp file that is renamed over `path`, so readers see either the
    /// old or the new file. Missing parent directories are created.
    pub fn write_locked(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let lock_path = path.with_extension("toml.lock");
        let guard = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        guard
            .lock_exclusive()
            .with_context(|| format!("Failed to lock {}", lock_path.display()))?;

        let staged = path.with_extension("toml.tmp");
        let result = stage(&staged, content).and_then(|()| {
            std::fs::rename(&staged, path)
                .with_context(|| format!("Failed to replace config: {}", path.display()))
        });
        if result.is_err() {
            let _ = std::fs::remove_file(&staged);
        }

        if let Err(e) = FileExt::unlock(&guard) {
            tracing::debug!("Config lock released on close: {}", e);
        }
        result
    }
}

fn stage(path: &Path, content: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create temp file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .context("Failed to write config content")?;
    file.sync_all().context("Failed to sync config file")
}
