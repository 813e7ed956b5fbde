//! Command handlers
//!
//! Each handler works against one `TcsSync` built at startup and prints its
//! result either as text or as JSON.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tcs::{
    FileLogStorage, HttpTransport, LogId, PersistOutcome, SyncLogEntry, SyncOutcome, TcsConfig,
    TcsSync, entries_for_date, has_committed_success, recent, stats,
};

use crate::cli::Command;

/// Wiring shared by every command
pub struct App {
    config: TcsConfig,
    sync: TcsSync,
    json: bool,
}

impl App {
    /// Build the app from configuration, with history in the Worklog data directory
    pub fn new(config: TcsConfig, json: bool) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        let storage = FileLogStorage::open_default()?;
        info!("Sync history stored in {}", storage.root().display());

        let sync = TcsSync::init(Arc::new(transport), Arc::new(storage));
        Ok(Self { config, sync, json })
    }

    pub fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Sync {
                date,
                commit,
                dry_run,
                force,
            } => {
                let dry_run = if commit {
                    false
                } else {
                    dry_run || self.config.default_dry_run
                };
                self.sync(date, dry_run, force)
            }
            Command::Preview { date } => self.preview(date),
            Command::PreviewRange { start, end } => self.preview_range(start, end),
            Command::Log { limit, date } => self.log(limit, date),
            Command::Stats => self.stats(),
            Command::Check { date } => self.check(date),
            Command::Delete { id } => self.delete(LogId::from(id)),
            Command::Clear => self.clear(),
            Command::Config { save } => self.show_config(save),
        }
    }

    fn sync(&self, date: NaiveDate, dry_run: bool, force: bool) -> Result<()> {
        if !dry_run && has_committed_success(self.sync.audit_log(), date) {
            if !force {
                bail!("{date} was already synced to TCS; pass --force to sync it again");
            }
            warn!("{} was already synced to TCS, syncing again (--force)", date);
        }

        if !self.json {
            let mode = if dry_run { "dry run" } else { "commit" };
            println!("Syncing {date} to TCS ({mode}), this can take a couple of minutes...");
        }

        let outcome = self.sync.sync_to_tcs(date, dry_run)?;
        self.print_outcome(&outcome)
    }

    fn preview(&self, date: NaiveDate) -> Result<()> {
        let outcome = self.sync.preview_format(date)?;
        self.print_outcome(&outcome)
    }

    fn preview_range(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        if end < start {
            bail!("end date {end} is before start date {start}");
        }

        let range = self.sync.preview_format_range(start, end)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&range)?);
        } else {
            println!("{}", range.formatted_text);
            println!();
            println!(
                "{} day(s), {} hours total ({} - {})",
                range.daily_formats.len(),
                range.total_hours,
                range.start_date,
                range.end_date
            );
        }
        Ok(())
    }

    fn log(&self, limit: usize, date: Option<NaiveDate>) -> Result<()> {
        let entries: Vec<SyncLogEntry> = match date {
            Some(date) => entries_for_date(self.sync.audit_log(), date)
                .into_iter()
                .take(limit)
                .collect(),
            None => recent(self.sync.audit_log(), limit),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No sync attempts recorded");
            return Ok(());
        }
        for entry in &entries {
            println!("{}", format_entry(entry));
        }
        Ok(())
    }

    fn stats(&self) -> Result<()> {
        let stats = stats(self.sync.audit_log());
        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "{} attempts: {} committed, {} previews, {} failed",
                stats.total, stats.success, stats.preview, stats.failed
            );
        }
        Ok(())
    }

    fn check(&self, date: NaiveDate) -> Result<()> {
        let committed = has_committed_success(self.sync.audit_log(), date);
        if self.json {
            println!("{}", json!({ "date": date, "committed": committed }));
        } else if committed {
            println!("{date} has been synced to TCS");
        } else {
            println!("{date} has not been synced to TCS");
        }
        Ok(())
    }

    fn delete(&self, id: LogId) -> Result<()> {
        match self.sync.delete_log(&id) {
            None => bail!("No sync log entry with id {id}"),
            Some(PersistOutcome::Ok) => {
                if !self.json {
                    println!("Deleted {id}");
                }
            }
            Some(PersistOutcome::Warning(reason)) => {
                println!("Deleted {id} for this session, but could not be saved: {reason}");
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.sync.clear_all_logs() {
            PersistOutcome::Ok => {
                if !self.json {
                    println!("Sync log cleared");
                }
            }
            PersistOutcome::Warning(reason) => {
                println!("Sync log cleared for this session, but could not be saved: {reason}");
            }
        }
        Ok(())
    }

    fn show_config(&self, save: bool) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        if save {
            let path = self.config.save()?;
            info!("Saved TCS config to {}", path.display());
        }
        Ok(())
    }

    fn print_outcome(&self, outcome: &SyncOutcome) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(outcome)?);
            return Ok(());
        }

        println!("{}", outcome.summary());
        if let Some(count) = outcome.filled_count {
            println!("Filled: {count}");
        }
        if let Some(hours) = outcome.total_hours {
            println!("Total hours: {hours}");
        }
        if let Some(path) = &outcome.screenshot_path {
            println!("Screenshot: {path}");
        }
        Ok(())
    }
}

/// One log line: time, id, date, status, then message or error
fn format_entry(entry: &SyncLogEntry) -> String {
    let detail = match (&entry.error, entry.filled_count) {
        (Some(error), _) => error.clone(),
        (None, Some(count)) => format!("{} ({} filled)", entry.message, count),
        (None, None) => entry.message.clone(),
    };
    format!(
        "{}  {}  {}  {:<7}  {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.id,
        entry.date,
        entry.status,
        detail
    )
}
