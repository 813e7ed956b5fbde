//! Domain models for TCS sync

mod outcome;
mod sync_log;

pub use outcome::{RangePreview, SyncOutcome, TcsEntry};
pub use sync_log::{LogId, SyncAttempt, SyncLogEntry, SyncStatus};
