//! tcs-sync - Sync worklog time entries to TCS from the command line
//!
//! This is the main entry point for the TCS sync client.

use clap::Parser;
use log::{debug, error, warn};
use tcs::TcsConfig;

mod cli;
mod commands;

use cli::Cli;
use commands::App;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Bootstrap config and data directories
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let tcs_config = match TcsConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid TCS configuration: {:#}", e);
            if let Some(path) = TcsConfig::default_config_path() {
                warn!(
                    "To configure the TCS backend, either:\n\
                     1. Fix or create the config file at: {}\n\
                     2. Or set environment variables: TCS_API_BASE_URL, TCS_SYNC_TIMEOUT_MS, TCS_PREVIEW_TIMEOUT_MS",
                    path.display()
                );
            }
            std::process::exit(2);
        }
    };
    debug!("Using TCS backend at {}", tcs_config.base_url);

    let result = App::new(tcs_config, cli.json).and_then(|app| app.run(cli.command));
    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
