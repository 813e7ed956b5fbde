//! Query API for UI consumption
//!
//! Derived views over the sync audit log. The log is the single source of
//! truth, so every view is recomputed on demand.

mod logs;

pub use logs::{
    DEFAULT_RECENT, SyncStats, count_by_status, entries_for_date, failed_count,
    has_committed_success, recent, stats, success_count,
};
