//! Command-line definition

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tcs::DEFAULT_RECENT;

#[derive(Parser, Debug)]
#[command(name = "tcs-sync", version, about = "Sync worklog time entries to TCS")]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fill a day's time entries into TCS
    ///
    /// Without --commit or --dry-run the configured default applies
    /// (a dry run unless configured otherwise).
    Sync {
        /// Date to sync (YYYY-MM-DD)
        date: NaiveDate,
        /// Write to TCS for real
        #[arg(long, conflicts_with = "dry_run")]
        commit: bool,
        /// Only simulate the fill
        #[arg(long)]
        dry_run: bool,
        /// Commit even if this date was already committed
        #[arg(long)]
        force: bool,
    },
    /// Show a day's entries as they would be sent to TCS
    Preview {
        /// Date to format (YYYY-MM-DD)
        date: NaiveDate,
    },
    /// Show every day with entries in a date range
    PreviewRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    /// List recent sync attempts
    Log {
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT)]
        limit: usize,
        /// Only attempts for this date
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Count sync attempts by outcome
    Stats,
    /// Report whether a date has a committed sync
    Check {
        date: NaiveDate,
    },
    /// Delete one sync log entry
    Delete {
        id: String,
    },
    /// Delete the whole sync log
    Clear,
    /// Show the active configuration
    Config {
        /// Write it to the config directory
        #[arg(long)]
        save: bool,
    },
}
