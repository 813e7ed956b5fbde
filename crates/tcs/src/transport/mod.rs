//! Transport to the remote TCS automation backend
//!
//! This module provides:
//! - The `SyncTransport` trait the sync orchestrator is driven through
//! - `RemoteError`, the failure type shared by every remote operation
//! - `HttpTransport`, the production implementation over HTTP

mod error;
mod http;

pub use error::{RemoteError, RemoteErrorKind};
pub use http::HttpTransport;

use chrono::NaiveDate;

use crate::models::{RangePreview, SyncOutcome};

/// Remote operations against the TCS automation backend
///
/// Implementations have no local side effects; everything they change lives
/// in the remote system. Calls may block for as long as their timeout budget.
pub trait SyncTransport: Send + Sync {
    /// Fill the time entries of `date` into TCS, or simulate it when `dry_run`
    fn trigger_sync(&self, date: NaiveDate, dry_run: bool) -> Result<SyncOutcome, RemoteError>;

    /// Format the entries of `date` as they would be sent, without automation
    fn preview_format(&self, date: NaiveDate) -> Result<SyncOutcome, RemoteError>;

    /// Format every date in `start..=end` that has entries
    fn preview_format_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangePreview, RemoteError>;
}
