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

//! Fixtures for end-to-end import tests: controller dumps on disk, an on-disk
//! statistics database and an importer wired to both.

use chrono::{Days, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use crossbeam_channel::Receiver;
use fluxion_heater_adapters::{
    ChannelNotifier, JsonDumpSource, PROGRAM_SLOTS, SLOTS_PER_DAY, StatisticsUpdate,
};
use fluxion_heater_core::{StatisticsImporter, resolve_local};
use fluxion_heater_store::SqliteStatisticsStore;
use fluxion_heater_types::{Circuit, FoldPolicy, ImporterSettings};
use serde_json::{Value, json};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const ENTRY_ID: &str = "water_heater";

/// Temporary directory holding controller dumps and the statistics database
#[derive(Debug)]
pub struct DumpFixture {
    dir: TempDir,
}

impl DumpFixture {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.path().join("statistics.db")
    }

    pub fn source(&self) -> JsonDumpSource {
        JsonDumpSource::new(self.dir.path())
    }

    pub fn write_programs(&self, blocks: &[Value]) -> io::Result<()> {
        std::fs::write(
            self.dir.path().join(JsonDumpSource::PROGRAM_FILE),
            Value::Array(blocks.to_vec()).to_string(),
        )
    }

    pub fn write_history(&self, window: u32, rows: &[Value]) -> io::Result<()> {
        std::fs::write(
            self.source().history_path(window),
            Value::Array(rows.to_vec()).to_string(),
        )
    }

    pub fn open_store(&self) -> anyhow::Result<Arc<SqliteStatisticsStore>> {
        Ok(Arc::new(SqliteStatisticsStore::open(self.database_path())?))
    }

    /// Importer reading this fixture's dumps and committing into `store`
    pub fn importer(
        &self,
        store: Arc<SqliteStatisticsStore>,
        timezone: Tz,
    ) -> (StatisticsImporter, Receiver<StatisticsUpdate>) {
        let source = Arc::new(self.source());
        let (notifier, updates) = ChannelNotifier::unbounded();
        let settings = ImporterSettings {
            timezone,
            ..ImporterSettings::default()
        };

        let importer = StatisticsImporter::new(
            ENTRY_ID,
            settings,
            source.clone(),
            source,
            store,
            Arc::new(notifier),
        );
        (importer, updates)
    }
}

/// Schedule block for one circuit; `days` holds `(minute, kind)` pairs per
/// weekday, Monday first, padded to the controller's six slots
pub fn program_block(circuit: Circuit, days: [&[(u16, u8)]; 7]) -> Value {
    let mut slots = Vec::with_capacity(PROGRAM_SLOTS);
    for day in days {
        let mut count = 0;
        for (offset, kind) in day.iter().take(SLOTS_PER_DAY) {
            slots.push(json!({"O": offset, "T": kind}));
            count += 1;
        }
        for _ in count..SLOTS_PER_DAY {
            slots.push(json!({"O": 65535, "T": 255}));
        }
    }
    json!({"I": circuit.wire_index(), "D": slots})
}

/// Same transitions on every weekday
pub fn daily_block(circuit: Circuit, transitions: &[(u16, u8)]) -> Value {
    program_block(circuit, [transitions; 7])
}

/// History row as the controller stamps it, five minutes after the local
/// midnight that ends `report_day`
pub fn history_row(
    tz: Tz,
    report_day: NaiveDate,
    primary: (f64, u32),
    boost: (f64, u32),
) -> Value {
    let next_day = report_day
        .checked_add_days(Days::new(1))
        .unwrap_or(report_day);
    let stamp = next_day.and_time(NaiveTime::from_hms_opt(0, 5, 0).unwrap_or(NaiveTime::MIN));
    let epoch = resolve_local(tz, stamp, FoldPolicy::Earliest).timestamp();

    json!({
        "epoch_seconds": epoch,
        "primary_energy_kwh": primary.0,
        "primary_active_minutes": primary.1,
        "boost_energy_kwh": boost.0,
        "boost_active_minutes": boost.1,
    })
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
