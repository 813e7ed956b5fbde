//! Audit log entries recording each TCS sync attempt

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use super::SyncOutcome;

/// Summary recorded on every failed attempt; the detail goes in `error`
const FAILED_MESSAGE: &str = "sync failed";

/// Length of the random base-36 suffix on generated ids
const SUFFIX_LEN: usize = 9;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Unique identifier for a sync log entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogId(pub String);

impl LogId {
    /// Mint a fresh id: `<unix millis>_<random base-36 suffix>`
    ///
    /// The suffix keeps ids distinct when several attempts start within
    /// the same millisecond.
    pub fn generate() -> Self {
        Self(format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            random_suffix()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LogId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LogId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a random base-36 suffix from a freshly keyed hasher
fn random_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(COUNTER.fetch_add(1, Ordering::Relaxed));
    let mut n = hasher.finish();

    let mut suffix = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        suffix.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    suffix
}

/// Outcome classification of a sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Dry run that completed; nothing was written to TCS
    Preview,
    /// Committed run that completed
    Success,
    /// The remote call failed, dry run or not
    Failed,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 3] = [SyncStatus::Preview, SyncStatus::Success, SyncStatus::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Preview => "preview",
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One record in the sync audit log
///
/// Entries are immutable once created. They leave the log only through
/// capacity eviction, explicit deletion or a full clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: LogId,
    /// Calendar date the attempt targeted
    pub date: NaiveDate,
    pub status: SyncStatus,
    /// When the attempt started
    pub timestamp: DateTime<Utc>,
    /// Human-readable outcome summary
    pub message: String,
    /// Records written by TCS (committed success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_count: Option<u32>,
    /// Error detail (failed only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub dry_run: bool,
}

impl SyncLogEntry {
    /// Whether this entry records a real, committed write to TCS
    pub fn is_committed_success(&self) -> bool {
        self.status == SyncStatus::Success && !self.dry_run
    }

    /// Check that status, dry-run flag and optional fields agree
    ///
    /// Entries built through [`SyncAttempt`] always pass. Stored history
    /// is checked with this before it is trusted.
    pub fn check_consistency(&self) -> Result<(), &'static str> {
        match self.status {
            SyncStatus::Preview if !self.dry_run => return Err("preview entry is not a dry run"),
            SyncStatus::Success if self.dry_run => return Err("success entry is a dry run"),
            SyncStatus::Failed if self.error.is_none() => return Err("failed entry has no error"),
            _ => {}
        }
        if self.error.is_some() && self.status != SyncStatus::Failed {
            return Err("only failed entries carry an error");
        }
        if self.filled_count.is_some() && self.status != SyncStatus::Success {
            return Err("only committed successes carry a filled count");
        }
        Ok(())
    }
}

/// An in-flight sync invocation
///
/// Minted when the sync starts so the eventual log entry carries the id and
/// start time of the invocation, whichever way it settles.
#[derive(Debug, Clone)]
pub struct SyncAttempt {
    pub id: LogId,
    pub date: NaiveDate,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
}

impl SyncAttempt {
    pub fn start(date: NaiveDate, dry_run: bool) -> Self {
        Self {
            id: LogId::generate(),
            date,
            dry_run,
            started_at: Utc::now(),
        }
    }

    /// Build the log entry for a successful remote call
    pub fn succeeded(self, outcome: &SyncOutcome) -> SyncLogEntry {
        let (status, filled_count) = if self.dry_run {
            (SyncStatus::Preview, None)
        } else {
            (SyncStatus::Success, outcome.filled_count)
        };

        SyncLogEntry {
            id: self.id,
            date: self.date,
            status,
            timestamp: self.started_at,
            message: outcome.message.clone(),
            filled_count,
            error: None,
            dry_run: self.dry_run,
        }
    }

    /// Build the log entry for a failed remote call
    pub fn failed(self, error: impl Into<String>) -> SyncLogEntry {
        SyncLogEntry {
            id: self.id,
            date: self.date,
            status: SyncStatus::Failed,
            timestamp: self.started_at,
            message: FAILED_MESSAGE.to_string(),
            filled_count: None,
            error: Some(error.into()),
            dry_run: self.dry_run,
        }
    }
}
