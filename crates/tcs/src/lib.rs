//! TCS crate - Business logic for syncing time entries to TCS
//!
//! This crate provides the client side of the TCS (time card system)
//! integration:
//! - Domain models (SyncLogEntry, SyncOutcome)
//! - HTTP transport to the backend driving the TCS automation
//! - Durable key-value storage for client-side state
//! - Sync orchestrator with a bounded, persisted audit log
//! - Query API over the audit log
//!
//! Everything is synchronous and has zero UI dependencies.

pub mod config;
pub mod models;
pub mod query;
pub mod storage;
pub mod sync;
pub mod transport;

pub use self::config::TcsConfig;
pub use models::{LogId, RangePreview, SyncAttempt, SyncLogEntry, SyncOutcome, SyncStatus, TcsEntry};
pub use query::{
    DEFAULT_RECENT, SyncStats, count_by_status, entries_for_date, failed_count,
    has_committed_success, recent, stats, success_count,
};
pub use storage::{FileLogStorage, InMemoryLogStorage, LogStorage};
pub use sync::{AuditLog, HistoryError, MAX_LOGS, PersistOutcome, SYNC_LOGS_KEY, SyncError, TcsSync};
pub use transport::{HttpTransport, RemoteError, RemoteErrorKind, SyncTransport};
