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

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use fluxion_heater_core::{CommitOutcome, DayCommit, StatisticsStore};
use fluxion_heater_types::{Circuit, CumulativeTotal, EnergySource, StoredDay};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS statistics_totals (
        entry_id        TEXT NOT NULL,
        circuit         TEXT NOT NULL,
        report_date     TEXT NOT NULL,
        cumulative_kwh  REAL NOT NULL,
        updated_at      TEXT NOT NULL,
        PRIMARY KEY (entry_id, circuit)
    );

    CREATE TABLE IF NOT EXISTS statistics_imports (
        entry_id           TEXT NOT NULL,
        circuit            TEXT NOT NULL,
        report_date        TEXT NOT NULL,
        energy_kwh         REAL NOT NULL,
        cumulative_kwh     REAL NOT NULL,
        runtime_minutes    INTEGER NOT NULL,
        scheduled_minutes  INTEGER NOT NULL,
        anchor             TEXT NOT NULL,
        energy_source      TEXT NOT NULL,
        imported_at        TEXT NOT NULL,
        PRIMARY KEY (entry_id, circuit, report_date)
    );";

type DayRow = (
    NaiveDate,
    f64,
    f64,
    u32,
    u32,
    DateTime<FixedOffset>,
    String,
);

/// SQLite-backed imported days and cumulative totals.
///
/// Every day is recorded in `statistics_imports` together with its running
/// total as of that day, inside one transaction that also updates the circuit's
/// overall total. The import row doubles as the idempotence marker.
#[derive(Debug)]
pub struct SqliteStatisticsStore {
    conn: Mutex<Connection>,
}

impl SqliteStatisticsStore {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!("💾 Statistics database opened at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn is_imported(&self, entry_id: &str, circuit: Circuit, day: NaiveDate) -> Result<bool> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM statistics_imports
                 WHERE entry_id = ?1 AND circuit = ?2 AND report_date = ?3",
                params![entry_id, circuit.as_str(), day],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Fold one day into the running totals.
    ///
    /// A new day starts from the running total of the closest earlier day and
    /// raises the totals of all later days. Replaying a day returns the stored
    /// row unchanged.
    pub fn record_day(
        &self,
        entry_id: &str,
        circuit: Circuit,
        day: &DayCommit,
    ) -> Result<CommitOutcome> {
        if !day.energy_kwh.is_finite() || day.energy_kwh < 0.0 {
            return Err(StoreError::Corrupt(format!(
                "refusing to add {} kWh to the {circuit} total",
                day.energy_kwh
            )));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let prior: f64 = tx
            .query_row(
                "SELECT cumulative_kwh FROM statistics_imports
                 WHERE entry_id = ?1 AND circuit = ?2 AND report_date < ?3
                 ORDER BY report_date DESC
                 LIMIT 1",
                params![entry_id, circuit.as_str(), day.report_day],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0.0);

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO statistics_imports
                (entry_id, circuit, report_date, energy_kwh, cumulative_kwh, runtime_minutes,
                 scheduled_minutes, anchor, energy_source, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry_id,
                circuit.as_str(),
                day.report_day,
                day.energy_kwh,
                prior + day.energy_kwh,
                day.runtime_minutes,
                day.scheduled_minutes,
                day.anchor,
                day.energy_source.as_str(),
                now
            ],
        )? > 0;

        if inserted {
            let shifted = tx.execute(
                "UPDATE statistics_imports SET cumulative_kwh = cumulative_kwh + ?4
                 WHERE entry_id = ?1 AND circuit = ?2 AND report_date > ?3",
                params![entry_id, circuit.as_str(), day.report_day, day.energy_kwh],
            )?;
            if shifted > 0 {
                debug!(
                    "{circuit} {} inserted before {shifted} later days for '{entry_id}'",
                    day.report_day
                );
            }

            tx.execute(
                "INSERT INTO statistics_totals (entry_id, circuit, report_date, cumulative_kwh, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(entry_id, circuit) DO UPDATE SET
                    cumulative_kwh = cumulative_kwh + excluded.cumulative_kwh,
                    report_date = MAX(report_date, excluded.report_date),
                    updated_at = excluded.updated_at",
                params![entry_id, circuit.as_str(), day.report_day, day.energy_kwh, now],
            )?;
        } else {
            debug!("{circuit} {} already imported for '{entry_id}'", day.report_day);
        }

        let stored = query_days(&tx, entry_id, circuit, "=", day.report_day)?
            .pop()
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "{circuit} day {} vanished while importing for '{entry_id}'",
                    day.report_day
                ))
            })?;
        let total = read_total(&tx, entry_id, circuit)?.ok_or_else(|| {
            StoreError::Corrupt(format!(
                "{circuit} day {} is imported for '{entry_id}' but no total exists",
                day.report_day
            ))
        })?;
        tx.commit()?;

        Ok(CommitOutcome {
            day: stored,
            total,
            inserted,
        })
    }

    pub fn read_total(&self, entry_id: &str, circuit: Circuit) -> Result<Option<CumulativeTotal>> {
        let conn = self.conn.lock();
        read_total(&conn, entry_id, circuit)
    }

    /// Imported report days of a circuit, oldest first
    pub fn read_imported_days(&self, entry_id: &str, circuit: Circuit) -> Result<Vec<NaiveDate>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT report_date FROM statistics_imports
             WHERE entry_id = ?1 AND circuit = ?2
             ORDER BY report_date ASC",
        )?;
        let days = stmt
            .query_map(params![entry_id, circuit.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<NaiveDate>, _>>()?;
        Ok(days)
    }

    pub fn read_day(
        &self,
        entry_id: &str,
        circuit: Circuit,
        day: NaiveDate,
    ) -> Result<Option<StoredDay>> {
        let conn = self.conn.lock();
        Ok(query_days(&conn, entry_id, circuit, "=", day)?.pop())
    }

    /// Stored days strictly after `after`, oldest first
    pub fn read_days_after(
        &self,
        entry_id: &str,
        circuit: Circuit,
        after: NaiveDate,
    ) -> Result<Vec<StoredDay>> {
        let conn = self.conn.lock();
        query_days(&conn, entry_id, circuit, ">", after)
    }
}

fn read_total(
    conn: &Connection,
    entry_id: &str,
    circuit: Circuit,
) -> Result<Option<CumulativeTotal>> {
    let row = conn
        .query_row(
            "SELECT report_date, cumulative_kwh FROM statistics_totals
             WHERE entry_id = ?1 AND circuit = ?2",
            params![entry_id, circuit.as_str()],
            |row| Ok((row.get::<_, NaiveDate>(0)?, row.get::<_, f64>(1)?)),
        )
        .optional()?;

    match row {
        Some((_, cumulative_kwh)) if !cumulative_kwh.is_finite() => Err(StoreError::Corrupt(
            format!("{circuit} total for '{entry_id}' is {cumulative_kwh}"),
        )),
        Some((report_date, cumulative_kwh)) => Ok(Some(CumulativeTotal {
            entry_id: entry_id.to_owned(),
            circuit,
            report_date,
            cumulative_kwh,
        })),
        None => Ok(None),
    }
}

/// Import rows whose report date compares to `day` with `op`, oldest first
fn query_days(
    conn: &Connection,
    entry_id: &str,
    circuit: Circuit,
    op: &str,
    day: NaiveDate,
) -> Result<Vec<StoredDay>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT report_date, energy_kwh, cumulative_kwh, runtime_minutes, scheduled_minutes,
                anchor, energy_source
         FROM statistics_imports
         WHERE entry_id = ?1 AND circuit = ?2 AND report_date {op} ?3
         ORDER BY report_date ASC"
    ))?;
    let rows = stmt
        .query_map(params![entry_id, circuit.as_str(), day], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<DayRow>, _>>()?;

    rows.into_iter()
        .map(|row| stored_day(entry_id, circuit, row))
        .collect()
}

fn stored_day(entry_id: &str, circuit: Circuit, row: DayRow) -> Result<StoredDay> {
    let (
        report_day,
        energy_kwh,
        cumulative_kwh,
        runtime_minutes,
        scheduled_minutes,
        anchor,
        source,
    ) = row;
    if !energy_kwh.is_finite() || !cumulative_kwh.is_finite() {
        return Err(StoreError::Corrupt(format!(
            "{circuit} day {report_day} for '{entry_id}' holds {energy_kwh} / {cumulative_kwh} kWh"
        )));
    }
    let energy_source = source.parse::<EnergySource>().map_err(|e| {
        StoreError::Corrupt(format!("{circuit} day {report_day} for '{entry_id}': {e}"))
    })?;

    Ok(StoredDay {
        circuit,
        report_day,
        energy_kwh,
        cumulative_kwh,
        runtime_minutes,
        scheduled_minutes,
        anchor,
        energy_source,
    })
}

impl StatisticsStore for SqliteStatisticsStore {
    fn has_imported(
        &self,
        entry_id: &str,
        circuit: Circuit,
        report_day: NaiveDate,
    ) -> anyhow::Result<bool> {
        Ok(self.is_imported(entry_id, circuit, report_day)?)
    }

    fn commit(
        &self,
        entry_id: &str,
        circuit: Circuit,
        day: &DayCommit,
    ) -> anyhow::Result<CommitOutcome> {
        Ok(self.record_day(entry_id, circuit, day)?)
    }

    fn total(&self, entry_id: &str, circuit: Circuit) -> anyhow::Result<Option<CumulativeTotal>> {
        Ok(self.read_total(entry_id, circuit)?)
    }

    fn imported_days(&self, entry_id: &str, circuit: Circuit) -> anyhow::Result<Vec<NaiveDate>> {
        Ok(self.read_imported_days(entry_id, circuit)?)
    }

    fn days_after(
        &self,
        entry_id: &str,
        circuit: Circuit,
        after: NaiveDate,
    ) -> anyhow::Result<Vec<StoredDay>> {
        Ok(self.read_days_after(entry_id, circuit, after)?)
    }
}
