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

//! Seams to the outside world: controller data, durable totals and observers.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use fluxion_heater_types::{
    Circuit, CumulativeTotal, EnergySource, HistorySample, StatisticRecord, StatisticsState,
    StoredDay, WeeklyProgram,
};
use std::collections::HashMap;

/// Provider of the raw weekly on/off programs
#[async_trait]
pub trait ProgramSource: Send + Sync {
    /// Latest weekly program for every circuit the controller reports
    async fn fetch_weekly_programs(
        &self,
        entry_id: &str,
    ) -> Result<HashMap<Circuit, WeeklyProgram>>;
}

/// Provider of daily usage samples
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Samples of one history window. Window 0 is the most recent one, higher
    /// indices reach further into the past.
    async fn fetch_history(&self, entry_id: &str, window_index: u32)
    -> Result<Vec<HistorySample>>;
}

/// One finished day, ready to be folded into the running totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayCommit {
    pub report_day: NaiveDate,
    pub energy_kwh: f64,
    pub runtime_minutes: u32,
    pub scheduled_minutes: u32,
    pub anchor: DateTime<FixedOffset>,
    pub energy_source: EnergySource,
}

/// Result of committing one day
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// The day as stored, with its running total as of that day
    pub day: StoredDay,

    /// Circuit total over every imported day after the commit
    pub total: CumulativeTotal,

    /// False when the day had been imported before and nothing changed
    pub inserted: bool,
}

/// Durable store of imported days and cumulative totals.
///
/// Implementations must make `commit` atomic per day and idempotent: replaying
/// an imported day returns the stored row unchanged. Inserting a day older than
/// already imported ones raises the running totals of every later day.
pub trait StatisticsStore: Send + Sync {
    fn has_imported(&self, entry_id: &str, circuit: Circuit, report_day: NaiveDate)
    -> Result<bool>;

    fn commit(&self, entry_id: &str, circuit: Circuit, day: &DayCommit)
    -> Result<CommitOutcome>;

    fn total(&self, entry_id: &str, circuit: Circuit) -> Result<Option<CumulativeTotal>>;

    fn imported_days(&self, entry_id: &str, circuit: Circuit) -> Result<Vec<NaiveDate>>;

    /// Stored days strictly after `after`, oldest first
    fn days_after(&self, entry_id: &str, circuit: Circuit, after: NaiveDate)
    -> Result<Vec<StoredDay>>;
}

/// Receives the outcome of every completed import run
pub trait StatisticsNotifier: Send + Sync {
    fn notify(&self, state: &StatisticsState, records: &[StatisticRecord]);
}
