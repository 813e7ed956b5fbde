//! Configuration for the TCS sync client
//!
//! Settings are loaded from (in order of priority):
//! 1. JSON file (~/.config/worklog/tcs.json)
//! 2. Runtime environment variables
//! 3. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Config filename in the Worklog config directory
const CONFIG_FILE: &str = "tcs.json";

const ENV_BASE_URL: &str = "TCS_API_BASE_URL";
const ENV_SYNC_TIMEOUT: &str = "TCS_SYNC_TIMEOUT_MS";
const ENV_PREVIEW_TIMEOUT: &str = "TCS_PREVIEW_TIMEOUT_MS";

/// Settings for talking to the TCS automation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcsConfig {
    /// Base URL of the backend exposing `/api/tcs/*`
    pub base_url: String,
    /// Budget for a sync run, which drives a browser on the remote side
    pub sync_timeout_ms: u64,
    /// Budget for format previews
    pub preview_timeout_ms: u64,
    /// Whether `sync` runs as a dry run unless told otherwise
    pub default_dry_run: bool,
}

impl Default for TcsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            sync_timeout_ms: 120_000,
            preview_timeout_ms: 30_000,
            default_dry_run: true,
        }
    }
}

impl TcsConfig {
    /// Load configuration using the following priority:
    /// 1. JSON file (~/.config/worklog/tcs.json)
    /// 2. Runtime environment variables (unset ones keep their defaults)
    pub fn load() -> Result<Self> {
        if let Some(loaded) = config::try_load_json::<Self>(CONFIG_FILE)? {
            return loaded.validated();
        }

        Self::from_env()
    }

    /// Load configuration from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let loaded: Self = config::load_json_file(path)?;
        loaded.validated()
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json).context("Failed to parse TCS config JSON")?;
        parsed.validated()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            cfg.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_SYNC_TIMEOUT) {
            cfg.sync_timeout_ms = raw
                .parse()
                .with_context(|| format!("{ENV_SYNC_TIMEOUT} must be a number of milliseconds"))?;
        }
        if let Some(raw) = lookup(ENV_PREVIEW_TIMEOUT) {
            cfg.preview_timeout_ms = raw
                .parse()
                .with_context(|| format!("{ENV_PREVIEW_TIMEOUT} must be a number of milliseconds"))?;
        }

        cfg.validated()
    }

    fn validated(self) -> Result<Self> {
        self.base()?;
        anyhow::ensure!(self.sync_timeout_ms > 0, "sync_timeout_ms must be positive");
        anyhow::ensure!(self.preview_timeout_ms > 0, "preview_timeout_ms must be positive");
        Ok(self)
    }

    /// The base URL, normalized to end in `/` so relative joins keep any path prefix
    pub fn base(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).with_context(|| format!("Invalid TCS base URL: {}", self.base_url))
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn preview_timeout(&self) -> Duration {
        Duration::from_millis(self.preview_timeout_ms)
    }

    /// Write this configuration to the Worklog config directory
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(CONFIG_FILE, self)
    }

    /// Get the default config file path (~/.config/worklog/tcs.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }
}
