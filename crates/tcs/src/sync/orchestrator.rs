//! Sync orchestration: one TCS sync invocation at a time, every attempt audited

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::audit_log::{AuditLog, PersistOutcome};
use crate::models::{LogId, RangePreview, SyncAttempt, SyncLogEntry, SyncOutcome};
use crate::storage::LogStorage;
use crate::transport::{RemoteError, SyncTransport};

/// Why a sync invocation did not produce an outcome
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Another sync is still in flight; nothing was sent or logged
    #[error("a TCS sync is already in progress")]
    Busy,
    /// The remote call failed; the attempt was logged as failed
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SyncError {
    /// The underlying remote failure, if any
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            SyncError::Remote(e) => Some(e),
            SyncError::Busy => None,
        }
    }
}

/// Holds the busy flag for the duration of one sync
///
/// The flag is released on drop, so it clears on every exit path,
/// including unwinding.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// TCS sync coordinator
///
/// Owns the audit log and drives the transport. Construct one per session
/// with [`TcsSync::init`] and share it by reference (or `Arc`).
///
/// A sync is performed in three steps:
/// 1. Mark the coordinator busy and mint an attempt id
/// 2. Call the remote automation
/// 3. Record the result in the audit log, then release the busy flag
///
/// By the time `sync_to_tcs` returns, the audit log already reflects the attempt.
pub struct TcsSync {
    transport: Arc<dyn SyncTransport>,
    log: AuditLog,
    syncing: AtomicBool,
    last_result: RwLock<Option<SyncOutcome>>,
}

impl TcsSync {
    /// Create a coordinator, hydrating the audit log from storage
    pub fn init(transport: Arc<dyn SyncTransport>, storage: Arc<dyn LogStorage>) -> Self {
        Self {
            transport,
            log: AuditLog::load(storage),
            syncing: AtomicBool::new(false),
            last_result: RwLock::new(None),
        }
    }

    /// Sync the time entries of `date` to TCS
    ///
    /// With `dry_run` the remote side only simulates the fill. Every attempt
    /// that reaches the transport is logged; failures are logged and then
    /// returned. Fails with [`SyncError::Busy`] without side effects if a
    /// sync is already running.
    pub fn sync_to_tcs(&self, date: NaiveDate, dry_run: bool) -> Result<SyncOutcome, SyncError> {
        let _guard = SyncGuard::acquire(&self.syncing).ok_or(SyncError::Busy)?;
        let attempt = SyncAttempt::start(date, dry_run);

        info!(
            "Starting TCS sync {} for {} (dry_run: {})",
            attempt.id, date, dry_run
        );

        match self.transport.trigger_sync(date, dry_run) {
            Ok(outcome) => {
                self.record(attempt.succeeded(&outcome));
                *self
                    .last_result
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(outcome.clone());

                info!("TCS sync for {} finished: {}", date, outcome.message);
                Ok(outcome)
            }
            Err(e) => {
                let detail = e.error_detail();
                warn!("TCS sync for {} failed: {}", date, detail);

                self.record(attempt.failed(detail));
                Err(e.into())
            }
        }
    }

    /// Append to the audit log; a failed write never changes the sync result
    fn record(&self, entry: SyncLogEntry) {
        let id = entry.id.clone();
        match self.log.append(entry) {
            PersistOutcome::Ok => debug!("Recorded sync {}", id),
            PersistOutcome::Warning(_) => debug!("Recorded sync {} in memory only", id),
        }
    }

    /// Format preview of `date`; not audited and ignores the busy flag
    pub fn preview_format(&self, date: NaiveDate) -> Result<SyncOutcome, RemoteError> {
        self.transport.preview_format(date)
    }

    /// Format preview of every date in `start..=end`; not audited
    pub fn preview_format_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangePreview, RemoteError> {
        self.transport.preview_format_range(start, end)
    }

    /// Whether a sync is currently in flight
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Outcome of the most recent successful sync in this session
    pub fn last_result(&self) -> Option<SyncOutcome> {
        self.last_result
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The audit log, for queries
    pub fn audit_log(&self) -> &AuditLog {
        &self.log
    }

    /// Snapshot of the audit log, newest first
    pub fn logs(&self) -> Vec<SyncLogEntry> {
        self.log.entries()
    }

    /// Delete one log entry; `None` if no entry has that id
    pub fn delete_log(&self, id: &LogId) -> Option<PersistOutcome> {
        self.log.delete(id)
    }

    /// Remove every log entry
    pub fn clear_all_logs(&self) -> PersistOutcome {
        self.log.clear()
    }

    /// Evict entries beyond capacity; returns how many were dropped
    pub fn clear_old_logs(&self) -> usize {
        self.log.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use crate::storage::InMemoryLogStorage;
    use anyhow::bail;
    use std::sync::Mutex;

    /// Storage that reads nothing and refuses every write
    struct ReadOnlyStorage;

    impl LogStorage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            bail!("read-only file system")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            bail!("read-only file system")
        }
    }

    /// Transport returning canned results and recording calls
    struct ScriptedTransport {
        sync_result: Result<SyncOutcome, RemoteError>,
        calls: Mutex<Vec<(NaiveDate, bool)>>,
    }

    impl ScriptedTransport {
        fn ok(message: &str, filled_count: Option<u32>) -> Self {
            Self {
                sync_result: Ok(SyncOutcome {
                    message: message.to_string(),
                    filled_count,
                    ..Default::default()
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn err(error: RemoteError) -> Self {
            Self {
                sync_result: Err(error),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl SyncTransport for ScriptedTransport {
        fn trigger_sync(&self, date: NaiveDate, dry_run: bool) -> Result<SyncOutcome, RemoteError> {
            self.calls.lock().unwrap().push((date, dry_run));
            self.sync_result.clone()
        }

        fn preview_format(&self, _date: NaiveDate) -> Result<SyncOutcome, RemoteError> {
            Ok(SyncOutcome {
                formatted_text: Some("Date: 2024/05/01".to_string()),
                ..Default::default()
            })
        }

        fn preview_format_range(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<RangePreview, RemoteError> {
            Err(RemoteError::from_response(404, r#"{"detail": "no entries"}"#))
        }
    }

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn coordinator(transport: ScriptedTransport) -> (Arc<ScriptedTransport>, TcsSync) {
        let transport = Arc::new(transport);
        let sync = TcsSync::init(transport.clone(), Arc::new(InMemoryLogStorage::new()));
        (transport, sync)
    }

    #[test]
    fn test_dry_run_logs_preview() {
        let (transport, sync) = coordinator(ScriptedTransport::ok("12 entries would be filled", Some(12)));

        let outcome = sync.sync_to_tcs(may_first(), true).unwrap();
        assert_eq!(outcome.message, "12 entries would be filled");
        assert_eq!(*transport.calls.lock().unwrap(), vec![(may_first(), true)]);

        let logs = sync.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SyncStatus::Preview);
        assert!(logs[0].dry_run);
        assert_eq!(logs[0].filled_count, None);
        assert!(!sync.is_syncing());
    }

    #[test]
    fn test_committed_sync_logs_success_and_caches_result() {
        let (_, sync) = coordinator(ScriptedTransport::ok("done", Some(12)));

        let outcome = sync.sync_to_tcs(may_first(), false).unwrap();

        let logs = sync.logs();
        assert_eq!(logs[0].status, SyncStatus::Success);
        assert_eq!(logs[0].filled_count, Some(12));
        assert_eq!(sync.last_result(), Some(outcome));
    }

    #[test]
    fn test_failure_is_logged_and_returned() {
        let remote = RemoteError::from_response(500, r#"{"detail": "site unreachable"}"#);
        let (_, sync) = coordinator(ScriptedTransport::err(remote.clone()));

        let err = sync.sync_to_tcs(may_first(), false).unwrap_err();
        assert_eq!(err.remote(), Some(&remote));

        let logs = sync.logs();
        assert_eq!(logs[0].status, SyncStatus::Failed);
        assert_eq!(logs[0].error.as_deref(), Some("site unreachable"));
        assert!(!logs[0].dry_run);
        assert!(sync.last_result().is_none());
        assert!(!sync.is_syncing());
    }

    #[test]
    fn test_failed_dry_run_is_failed_not_preview() {
        let (_, sync) = coordinator(ScriptedTransport::err(RemoteError::timeout(
            std::time::Duration::from_secs(120),
        )));

        assert!(sync.sync_to_tcs(may_first(), true).is_err());

        let logs = sync.logs();
        assert_eq!(logs[0].status, SyncStatus::Failed);
        assert!(logs[0].dry_run);
        assert_eq!(logs[0].error.as_deref(), Some("timeout of 120000ms exceeded"));
    }

    #[test]
    fn test_busy_rejects_without_logging() {
        let (transport, sync) = coordinator(ScriptedTransport::ok("done", Some(1)));

        let guard = SyncGuard::acquire(&sync.syncing).unwrap();
        assert!(sync.is_syncing());
        assert!(matches!(sync.sync_to_tcs(may_first(), true), Err(SyncError::Busy)));
        assert!(transport.calls.lock().unwrap().is_empty());
        assert!(sync.logs().is_empty());

        drop(guard);
        assert!(!sync.is_syncing());
        assert!(sync.sync_to_tcs(may_first(), true).is_ok());
    }

    #[test]
    fn test_previews_are_not_audited() {
        let (_, sync) = coordinator(ScriptedTransport::ok("done", Some(1)));

        let preview = sync.preview_format(may_first()).unwrap();
        assert_eq!(preview.summary(), "Date: 2024/05/01");
        assert!(sync.preview_format_range(may_first(), may_first()).is_err());
        assert!(sync.logs().is_empty());
    }

    #[test]
    fn test_delete_and_clear() {
        let (_, sync) = coordinator(ScriptedTransport::ok("done", Some(1)));
        sync.sync_to_tcs(may_first(), true).unwrap();
        sync.sync_to_tcs(may_first(), false).unwrap();

        let id = sync.logs()[1].id.clone();
        assert_eq!(sync.delete_log(&id), Some(PersistOutcome::Ok));
        assert_eq!(sync.delete_log(&id), None);
        assert_eq!(sync.logs().len(), 1);
        assert_eq!(sync.clear_old_logs(), 0);

        assert!(sync.clear_all_logs().is_ok());
        assert!(sync.logs().is_empty());
    }

    #[test]
    fn test_storage_failure_does_not_fail_sync() {
        let transport = Arc::new(ScriptedTransport::ok("done", Some(4)));
        let sync = TcsSync::init(transport, Arc::new(ReadOnlyStorage));

        let outcome = sync.sync_to_tcs(may_first(), false).unwrap();
        assert_eq!(outcome.filled_count, Some(4));
        assert_eq!(sync.last_result(), Some(outcome));

        let logs = sync.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SyncStatus::Success);
        assert!(!sync.is_syncing());

        assert!(matches!(sync.delete_log(&logs[0].id), Some(PersistOutcome::Warning(_))));
        assert!(!sync.clear_all_logs().is_ok());
    }

    #[test]
    fn test_storage_failure_keeps_remote_error() {
        let remote = RemoteError::from_response(502, r#"{"detail": "bad gateway"}"#);
        let sync = TcsSync::init(Arc::new(ScriptedTransport::err(remote.clone())), Arc::new(ReadOnlyStorage));

        let err = sync.sync_to_tcs(may_first(), true).unwrap_err();
        assert_eq!(err.remote(), Some(&remote));
        assert_eq!(sync.logs()[0].error.as_deref(), Some("bad gateway"));
    }
}
