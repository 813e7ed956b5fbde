//! File-based key-value storage
//!
//! Directory structure:
//! ```text
//! ~/.local/share/worklog/
//!   tcs_sync_logs.json     # value stored under key "tcs_sync_logs"
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

use super::LogStorage;

/// One JSON file per key under a root directory
pub struct FileLogStorage {
    root: PathBuf,
}

impl FileLogStorage {
    /// Create a file store rooted at the given path
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage directory: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Create a file store in the Worklog data directory
    pub fn open_default() -> Result<Self> {
        let root = config::ensure_data_dir()?;
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the file path for a key
    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        anyhow::ensure!(
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "Invalid storage key: {key:?}"
        );
        Ok(self.root.join(format!("{key}.json")))
    }

    /// Temp file for one write, distinct per process and per call
    fn temp_path(&self, key: &str) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let seq = NEXT.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{key}.json.{}.{seq}.tmp", std::process::id()))
    }
}

impl LogStorage for FileLogStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key)?;

        // Write atomically (write to temp, then rename)
        let temp_path = self.temp_path(key);
        fs::write(&temp_path, value)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
