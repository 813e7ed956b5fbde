//! TCS sync engine
//!
//! Coordinates sync invocations against the remote automation and keeps a
//! bounded, persisted audit trail of every attempt.

mod audit_log;
mod orchestrator;

pub use audit_log::{AuditLog, HistoryError, MAX_LOGS, PersistOutcome, SYNC_LOGS_KEY};
pub use orchestrator::{SyncError, TcsSync};
