// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod app;
mod cli;
mod config;
mod nightly;

use app::{App, spawn_update_logger};
use cli::{Cli, Command};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;

    info!("🚀 Starting FluxION heater statistics importer");
    info!("📋 Configuration Summary:");
    info!("   Entry: {}", config.entry.id);
    info!("   Timezone: {}", config.importer.timezone);
    info!("   Database: {}", config.database.path);

    let default_windows = config.backfill.windows;
    let (app, updates) = App::build(config)?;
    let logger = spawn_update_logger(updates);

    let result = match cli.command {
        Command::RunOnce => app.run_once().await,
        Command::Daemon => app.daemon().await,
        Command::Backfill { windows } => app.backfill(windows.unwrap_or(default_windows)).await,
        Command::Totals => app.print_totals(),
    };

    // Closes the notification channel
    drop(app);
    if logger.join().is_err() {
        error!("❌ Statistics update logger panicked");
    }

    result
}
