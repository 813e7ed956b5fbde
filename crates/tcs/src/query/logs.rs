//! Sync log query functions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{SyncLogEntry, SyncStatus};
use crate::sync::AuditLog;

/// Number of entries shown by default in "recent activity" views
pub const DEFAULT_RECENT: usize = 10;

/// Entry counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub total: usize,
    pub preview: usize,
    pub success: usize,
    pub failed: usize,
}

/// The `n` most recent entries, newest first
pub fn recent(log: &AuditLog, n: usize) -> Vec<SyncLogEntry> {
    log.with_entries(|entries| entries.iter().take(n).cloned().collect())
}

/// Number of entries with the given status
pub fn count_by_status(log: &AuditLog, status: SyncStatus) -> usize {
    log.with_entries(|entries| entries.iter().filter(|e| e.status == status).count())
}

pub fn success_count(log: &AuditLog) -> usize {
    count_by_status(log, SyncStatus::Success)
}

pub fn failed_count(log: &AuditLog) -> usize {
    count_by_status(log, SyncStatus::Failed)
}

/// Counts for every status in one pass
pub fn stats(log: &AuditLog) -> SyncStats {
    log.with_entries(|entries| {
        entries.iter().fold(
            SyncStats {
                total: entries.len(),
                ..Default::default()
            },
            |mut acc, e| {
                match e.status {
                    SyncStatus::Preview => acc.preview += 1,
                    SyncStatus::Success => acc.success += 1,
                    SyncStatus::Failed => acc.failed += 1,
                }
                acc
            },
        )
    })
}

/// All entries targeting `date`, in log order
pub fn entries_for_date(log: &AuditLog, date: NaiveDate) -> Vec<SyncLogEntry> {
    log.with_entries(|entries| entries.iter().filter(|e| e.date == date).cloned().collect())
}

/// Whether `date` has already been written to TCS for real
///
/// Previews and failures don't count. Used to warn before re-running a
/// committed sync.
pub fn has_committed_success(log: &AuditLog, date: NaiveDate) -> bool {
    log.with_entries(|entries| {
        entries
            .iter()
            .any(|e| e.date == date && e.is_committed_success())
    })
}
