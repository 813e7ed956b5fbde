//! Bounded, persisted audit log of TCS sync attempts
//!
//! The log keeps the newest entry first and never holds more than
//! [`MAX_LOGS`] entries. Every mutation rewrites the whole log into a single
//! storage slot. Storage failures never interrupt the in-memory state: reads
//! fall back to an empty history and writes degrade to a logged warning.

use log::{debug, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{LogId, SyncLogEntry};
use crate::storage::LogStorage;

/// Storage key holding the serialized log
pub const SYNC_LOGS_KEY: &str = "tcs_sync_logs";

/// Maximum number of retained entries
pub const MAX_LOGS: usize = 50;

/// Result of a best-effort write to durable storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The full log was written
    Ok,
    /// The write was dropped; in-memory state is still authoritative
    Warning(String),
}

impl PersistOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, PersistOutcome::Ok)
    }
}

/// Why stored history could not be hydrated
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read stored history: {0:#}")]
    Storage(anyhow::Error),
    #[error("stored history is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("stored history repeats entry id {0}")]
    DuplicateId(LogId),
    #[error("stored entry {id} is inconsistent: {reason}")]
    Inconsistent { id: LogId, reason: &'static str },
}

/// In-memory audit log backed by a durable storage slot
///
/// Mutations hold the persist lock from the in-memory change until the
/// storage write returns, so storage always receives snapshots in the
/// order the log changed.
pub struct AuditLog {
    entries: RwLock<Vec<SyncLogEntry>>,
    storage: Arc<dyn LogStorage>,
    persisting: Mutex<()>,
}

impl AuditLog {
    /// Create an empty log without reading storage
    pub fn new(storage: Arc<dyn LogStorage>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            storage,
            persisting: Mutex::new(()),
        }
    }

    /// Create a log hydrated from storage
    pub fn load(storage: Arc<dyn LogStorage>) -> Self {
        let log = Self::new(storage);
        log.reload();
        log
    }

    /// Replace the in-memory log with what storage holds
    ///
    /// All or nothing: if any part of the stored history is unreadable the
    /// log resets to empty rather than trusting the rest of it.
    /// Returns the number of entries loaded.
    pub fn reload(&self) -> usize {
        let _persisting = self.lock_persist();
        let loaded = match self.read_history() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load sync logs, starting with empty history: {}", e);
                Vec::new()
            }
        };

        let count = loaded.len();
        *self.write() = loaded;
        debug!("Loaded {} sync log entries", count);
        count
    }

    fn read_history(&self) -> Result<Vec<SyncLogEntry>, HistoryError> {
        let Some(raw) = self
            .storage
            .get(SYNC_LOGS_KEY)
            .map_err(HistoryError::Storage)?
        else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<SyncLogEntry> = serde_json::from_str(&raw)?;

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(&entry.id) {
                return Err(HistoryError::DuplicateId(entry.id.clone()));
            }
            entry
                .check_consistency()
                .map_err(|reason| HistoryError::Inconsistent {
                    id: entry.id.clone(),
                    reason,
                })?;
        }

        entries.truncate(MAX_LOGS);
        Ok(entries)
    }

    /// Insert an entry at the front, evict beyond capacity, then persist
    pub fn append(&self, entry: SyncLogEntry) -> PersistOutcome {
        let _persisting = self.lock_persist();
        {
            let mut entries = self.write();
            entries.insert(0, entry);
            entries.truncate(MAX_LOGS);
        }
        self.write_through()
    }

    /// Drop entries beyond capacity without persisting
    ///
    /// Returns the number of entries evicted.
    pub fn truncate(&self) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.truncate(MAX_LOGS);
        before - entries.len()
    }

    /// Write the full log to storage
    pub fn persist(&self) -> PersistOutcome {
        let _persisting = self.lock_persist();
        self.write_through()
    }

    // Caller holds the persist lock
    fn write_through(&self) -> PersistOutcome {
        let serialized = match serde_json::to_string(&*self.read()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize sync logs: {}", e);
                return PersistOutcome::Warning(e.to_string());
            }
        };

        match self.storage.set(SYNC_LOGS_KEY, &serialized) {
            Ok(()) => PersistOutcome::Ok,
            Err(e) => {
                warn!("Failed to save sync logs: {:#}", e);
                PersistOutcome::Warning(format!("{e:#}"))
            }
        }
    }

    /// Remove the entry with `id` and persist
    ///
    /// Returns `None` without touching storage when no entry has that id.
    pub fn delete(&self, id: &LogId) -> Option<PersistOutcome> {
        let _persisting = self.lock_persist();
        let removed = {
            let mut entries = self.write();
            match entries.iter().position(|e| &e.id == id) {
                Some(index) => {
                    entries.remove(index);
                    true
                }
                None => false,
            }
        };

        removed.then(|| self.write_through())
    }

    /// Remove every entry and persist the empty log
    pub fn clear(&self) -> PersistOutcome {
        let _persisting = self.lock_persist();
        self.write().clear();
        self.write_through()
    }

    /// Snapshot of all entries, newest first
    pub fn entries(&self) -> Vec<SyncLogEntry> {
        self.read().clone()
    }

    /// Run `f` over the current entries without cloning them
    pub fn with_entries<R>(&self, f: impl FnOnce(&[SyncLogEntry]) -> R) -> R {
        f(&self.read())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic elsewhere must not wedge the log, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, Vec<SyncLogEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<SyncLogEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_persist(&self) -> MutexGuard<'_, ()> {
        self.persisting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SyncAttempt, SyncOutcome};
    use crate::storage::InMemoryLogStorage;
    use anyhow::bail;
    use chrono::NaiveDate;
    use std::time::Duration;

    struct BrokenStorage;

    impl LogStorage for BrokenStorage {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            bail!("disk unavailable")
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            bail!("quota exceeded")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            bail!("read-only")
        }
    }

    fn entry(day: u32) -> SyncLogEntry {
        let date = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let outcome = SyncOutcome {
            message: format!("day {day}"),
            filled_count: Some(day),
            ..Default::default()
        };
        SyncAttempt::start(date, false).succeeded(&outcome)
    }

    fn memory_log() -> (Arc<InMemoryLogStorage>, AuditLog) {
        let storage = Arc::new(InMemoryLogStorage::new());
        let log = AuditLog::load(storage.clone());
        (storage, log)
    }

    #[test]
    fn test_append_is_newest_first() {
        let (_, log) = memory_log();
        log.append(entry(1));
        log.append(entry(2));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "day 2");
        assert_eq!(entries[1].message, "day 1");
    }

    #[test]
    fn test_append_persists() {
        let (storage, log) = memory_log();
        assert!(log.append(entry(1)).is_ok());

        let raw = storage.get(SYNC_LOGS_KEY).unwrap().unwrap();
        let stored: Vec<SyncLogEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, log.entries());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let (_, log) = memory_log();
        let mut ids = Vec::new();
        for i in 0..(MAX_LOGS + 7) {
            let e = entry((i % 28) as u32 + 1);
            ids.push(e.id.clone());
            log.append(e);
        }

        let entries = log.entries();
        assert_eq!(entries.len(), MAX_LOGS);
        // Newest first: the last appended id leads, the first 7 are gone
        assert_eq!(entries[0].id, ids[ids.len() - 1]);
        assert_eq!(entries[MAX_LOGS - 1].id, ids[7]);
        assert!(!entries.iter().any(|e| ids[..7].contains(&e.id)));
    }

    #[test]
    fn test_delete() {
        let (storage, log) = memory_log();
        let first = entry(1);
        let id = first.id.clone();
        log.append(first);
        log.append(entry(2));

        assert_eq!(log.delete(&id), Some(PersistOutcome::Ok));
        assert_eq!(log.len(), 1);
        assert!(!storage.get(SYNC_LOGS_KEY).unwrap().unwrap().contains(id.as_str()));

        // Absent id is a no-op
        assert_eq!(log.delete(&id), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_clear_persists_empty_collection() {
        let (storage, log) = memory_log();
        log.append(entry(1));

        assert!(log.clear().is_ok());
        assert!(log.is_empty());
        assert_eq!(storage.get(SYNC_LOGS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_round_trip_through_storage() {
        let (storage, log) = memory_log();
        log.append(entry(1));
        log.append(SyncAttempt::start(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), true).failed("boom"));

        let reloaded = AuditLog::load(storage);
        assert_eq!(reloaded.entries(), log.entries());
    }

    #[test]
    fn test_missing_slot_loads_empty() {
        let (_, log) = memory_log();
        assert!(log.is_empty());
    }

    #[test]
    fn test_corrupt_json_resets_to_empty() {
        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, "{not json"));
        let log = AuditLog::load(storage);
        assert!(log.is_empty());
    }

    #[test]
    fn test_one_bad_timestamp_discards_everything() {
        let good = serde_json::to_value(entry(1)).unwrap();
        let mut bad = serde_json::to_value(entry(2)).unwrap();
        bad["timestamp"] = serde_json::json!("yesterday-ish");
        let raw = serde_json::to_string(&vec![good, bad]).unwrap();

        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, raw));
        let log = AuditLog::load(storage);
        assert!(log.is_empty());
    }

    #[test]
    fn test_wrong_shape_resets_to_empty() {
        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, r#"{"logs": []}"#));
        assert!(AuditLog::load(storage).is_empty());
    }

    #[test]
    fn test_duplicate_ids_reset_to_empty() {
        let e = entry(1);
        let raw = serde_json::to_string(&vec![e.clone(), e]).unwrap();
        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, raw));
        assert!(AuditLog::load(storage).is_empty());
    }

    #[test]
    fn test_oversized_history_is_truncated_on_load() {
        let entries: Vec<SyncLogEntry> = (0..60).map(|i| entry(i % 28 + 1)).collect();
        let raw = serde_json::to_string(&entries).unwrap();
        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, raw));

        let log = AuditLog::load(storage);
        assert_eq!(log.len(), MAX_LOGS);
        assert_eq!(log.entries()[0].id, entries[0].id);
    }

    #[test]
    fn test_unreadable_storage_loads_empty() {
        let log = AuditLog::load(Arc::new(BrokenStorage));
        assert!(log.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let log = AuditLog::load(Arc::new(BrokenStorage));

        let outcome = log.append(entry(1));
        assert!(matches!(outcome, PersistOutcome::Warning(ref w) if w.contains("quota exceeded")));
        assert_eq!(log.len(), 1);

        assert!(!log.clear().is_ok());
        assert!(log.is_empty());
    }

    #[test]
    fn test_failed_delete_write_is_reported() {
        let log = AuditLog::load(Arc::new(BrokenStorage));
        let e = entry(1);
        let id = e.id.clone();
        log.append(e);

        assert!(matches!(log.delete(&id), Some(PersistOutcome::Warning(_))));
        assert!(log.is_empty());
    }

    #[test]
    fn test_inconsistent_entries_reset_to_empty() {
        let good = serde_json::to_value(entry(1)).unwrap();
        let mut dry_success = serde_json::to_value(entry(2)).unwrap();
        dry_success["dry_run"] = serde_json::json!(true);
        let raw = serde_json::to_string(&vec![good.clone(), dry_success]).unwrap();
        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, raw));
        assert!(AuditLog::load(storage).is_empty());

        let mut counted_failure =
            serde_json::to_value(SyncAttempt::start(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(), false).failed("x"))
                .unwrap();
        counted_failure["filled_count"] = serde_json::json!(7);
        counted_failure.as_object_mut().unwrap().remove("error");
        let raw = serde_json::to_string(&vec![good, counted_failure]).unwrap();
        let storage = Arc::new(InMemoryLogStorage::with_value(SYNC_LOGS_KEY, raw));
        assert!(AuditLog::load(storage).is_empty());
    }

    /// Storage whose non-empty writes are slow, so a later clear can overtake them
    struct SlowStorage {
        inner: InMemoryLogStorage,
    }

    impl LogStorage for SlowStorage {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if value != "[]" {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_clear_during_slow_append_wins() {
        let storage = Arc::new(SlowStorage {
            inner: InMemoryLogStorage::new(),
        });
        let log = Arc::new(AuditLog::load(storage.clone()));

        let appender = {
            let log = log.clone();
            std::thread::spawn(move || log.append(entry(1)))
        };
        // The entry lands in memory before the slow write starts
        while log.is_empty() {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(log.clear().is_ok());
        assert!(appender.join().unwrap().is_ok());

        assert!(log.is_empty());
        assert_eq!(storage.get(SYNC_LOGS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(AuditLog::load(storage).is_empty());
    }

    #[test]
    fn test_truncate() {
        let (_, log) = memory_log();
        for i in 0..3 {
            log.append(entry(i + 1));
        }
        assert_eq!(log.truncate(), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_with_entries() {
        let (_, log) = memory_log();
        log.append(entry(1));
        let total: u32 = log.with_entries(|entries| entries.iter().filter_map(|e| e.filled_count).sum());
        assert_eq!(total, 1);
    }
}
