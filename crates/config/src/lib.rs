//! Shared on-disk locations for Worklog tools
//!
//! Two directories are managed here:
//! - [`Location::Config`]: hand-editable settings, `~/.config/worklog/`
//! - [`Location::Data`]: state the tools write themselves, such as sync
//!   history (`~/.local/share/worklog/` on Linux)
//!
//! Call [`init`] once at startup so both exist before anything is written.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "worklog";

/// Which Worklog directory a file belongs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Config,
    Data,
}

impl Location {
    /// Platform directory for this location, if the platform has one
    pub fn dir(self) -> Option<PathBuf> {
        let base = match self {
            Location::Config => dirs::config_dir(),
            Location::Data => dirs::data_dir(),
        };
        base.map(|p| p.join(APP_DIR))
    }

    /// Create the directory if needed and return it
    pub fn ensure(self) -> Result<PathBuf> {
        let dir = self
            .dir()
            .with_context(|| format!("Could not determine {} directory", self.label()))?;
        std::fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create {} directory: {}", self.label(), dir.display())
        })?;
        Ok(dir)
    }

    pub fn path(self, filename: &str) -> Option<PathBuf> {
        self.dir().map(|p| p.join(filename))
    }

    fn label(self) -> &'static str {
        match self {
            Location::Config => "config",
            Location::Data => "data",
        }
    }
}

/// Create the config and data directories; returns the config directory
pub fn init() -> Result<PathBuf> {
    Location::Data.ensure()?;
    Location::Config.ensure()
}

pub fn config_dir() -> Option<PathBuf> {
    Location::Config.dir()
}

pub fn data_dir() -> Option<PathBuf> {
    Location::Data.dir()
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    Location::Data.ensure()
}

/// Path of a settings file in the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    Location::Config.path(filename)
}

/// Read a settings file, or `None` if it has not been written yet
///
/// A file that exists but cannot be read or parsed is an error, so a typo
/// in a hand-edited file is never silently replaced by defaults.
pub fn try_load_json<T: DeserializeOwned>(filename: &str) -> Result<Option<T>> {
    let path = config_path(filename).context("Could not determine config directory")?;
    try_load_json_file(&path)
}

/// [`try_load_json`] for an explicit path
pub fn try_load_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read config file: {}", path.display()));
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Read a JSON file that must exist
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    try_load_json_file(path)?
        .with_context(|| format!("Config file not found: {}", path.display()))
}

/// Write `value` as pretty JSON into the config directory; returns the path
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<PathBuf> {
    let path = Location::Config.ensure()?.join(filename);
    write_json_file(&path, value)?;
    Ok(path)
}

/// Replace `path` with `value` as pretty JSON
///
/// Goes through a sibling temp file so readers never see a half-written file.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write config file: {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
