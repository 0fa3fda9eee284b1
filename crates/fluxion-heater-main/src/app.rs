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
use crossbeam_channel::Receiver;
use fluxion_heater_adapters::{ChannelNotifier, JsonDumpSource, StatisticsUpdate};
use fluxion_heater_core::{ImportAnomaly, ImportReport, RequestPacer, StatisticsImporter};
use fluxion_heater_store::SqliteStatisticsStore;
use fluxion_heater_types::Circuit;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::nightly::run_nightly;

/// Wired-up importer for one configured water heater
#[derive(Debug)]
pub struct App {
    pub config: AppConfig,
    importer: Arc<StatisticsImporter>,
    store: Arc<SqliteStatisticsStore>,
}

impl App {
    /// Build the importer from configuration, returning the receiving end of
    /// its notification channel
    pub fn build(config: AppConfig) -> Result<(Self, Receiver<StatisticsUpdate>)> {
        let settings = config.importer_settings()?;

        let store = SqliteStatisticsStore::open(&config.database.path).with_context(|| {
            format!("Failed to open statistics database: {}", config.database.path)
        })?;
        let store = Arc::new(store);

        let source = Arc::new(JsonDumpSource::new(&config.entry.data_dir));
        let (notifier, updates) = ChannelNotifier::bounded(16);

        let importer = StatisticsImporter::new(
            config.entry.id.clone(),
            settings,
            source.clone(),
            source,
            store.clone(),
            Arc::new(notifier),
        )
        .with_pacer(RequestPacer::new(config.backfill.max_requests_per_second));

        info!(
            "✅ Statistics importer ready for '{}' ({})",
            config.entry.id,
            config.entry.data_dir.display()
        );

        Ok((
            Self {
                config,
                importer: Arc::new(importer),
                store,
            },
            updates,
        ))
    }

    pub async fn run_once(&self) -> Result<()> {
        let watcher = self.cancel_on_ctrl_c();
        let result = self.importer.run().await;
        watcher.abort();

        log_report(&result?);
        Ok(())
    }

    pub async fn backfill(&self, windows: u32) -> Result<()> {
        let watcher = self.cancel_on_ctrl_c();
        let result = self.importer.backfill(windows).await;
        watcher.abort();

        log_report(&result?);
        Ok(())
    }

    /// Run the nightly loop until Ctrl-C
    pub async fn daemon(&self) -> Result<()> {
        self.log_totals()?;

        let trigger = self.config.trigger_time()?;
        let cancel = self.importer.cancellation();
        let handle = tokio::spawn(run_nightly(
            self.importer.clone(),
            trigger,
            self.config.schedule.run_on_startup,
        ));

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("🛑 Shutdown requested, stopping statistics importer");

        cancel.cancel();
        handle.abort();
        if let Err(e) = handle.await
            && !e.is_cancelled()
        {
            error!("❌ Nightly importer task ended unexpectedly: {e}");
        }
        Ok(())
    }

    /// Print the stored totals of every circuit
    pub fn print_totals(&self) -> Result<()> {
        let entry_id = &self.config.entry.id;
        println!("Statistics totals for '{entry_id}':");

        for circuit in Circuit::all().iter().copied() {
            let days = self.store.read_imported_days(entry_id, circuit)?;
            match self.store.read_total(entry_id, circuit)? {
                Some(total) => println!(
                    "  {:<8} {:>10.3} kWh  last day {}  ({} days imported)",
                    circuit.display_name(),
                    total.cumulative_kwh,
                    total.report_date,
                    days.len()
                ),
                None => println!("  {:<8} no imported days", circuit.display_name()),
            }
        }
        Ok(())
    }

    fn log_totals(&self) -> Result<()> {
        let entry_id = &self.config.entry.id;
        for circuit in Circuit::all().iter().copied() {
            if let Some(total) = self.store.read_total(entry_id, circuit)? {
                info!(
                    "📊 {} total: {:.3} kWh (last day {})",
                    circuit.display_name(),
                    total.cumulative_kwh,
                    total.report_date
                );
            }
        }
        Ok(())
    }

    fn cancel_on_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let cancel = self.importer.cancellation();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 Ctrl-C received, finishing the current day and stopping");
                cancel.cancel();
            }
        })
    }
}

/// Log the outcome of an import run
pub fn log_report(report: &ImportReport) {
    info!(
        "📋 Import {}: {} imported, {} already present, {} skipped, {} restated",
        report.phase, report.imported, report.duplicates, report.skipped, report.restated
    );

    for anomaly in &report.anomalies {
        match anomaly {
            ImportAnomaly::Schedule { circuit, anomaly } => {
                debug!("   {circuit} schedule: {anomaly:?}");
            }
            ImportAnomaly::Sample {
                circuit,
                timestamp,
                error,
            } => debug!("   {circuit} sample at {timestamp}: {error}"),
        }
    }
}

/// Log every published update until the importer goes away
pub fn spawn_update_logger(updates: Receiver<StatisticsUpdate>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for update in updates {
            for (circuit, summary) in &update.state.circuits {
                info!(
                    "📈 {} {}: {:.3} kWh (sum {:.3} kWh, {:?}), runtime {:.2} h, scheduled {:.2} h",
                    circuit.display_name(),
                    summary.report_day,
                    summary.energy_kwh,
                    summary.energy_sum,
                    summary.energy_source,
                    summary.runtime_hours,
                    summary.scheduled_hours
                );
            }
        }
    })
}
