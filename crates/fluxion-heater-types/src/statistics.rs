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

use chrono::{DateTime, DurationRound, FixedOffset, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calibration::EnergySource;
use crate::circuit::Circuit;

/// Convert a minute count to hours for display
pub fn minutes_to_hours(minutes: u32) -> f64 {
    f64::from(minutes) / 60.0
}

/// Persisted running energy total for one circuit of one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeTotal {
    pub entry_id: String,
    pub circuit: Circuit,

    /// Latest report day folded into the total
    pub report_date: NaiveDate,

    /// Sum of all imported daily energy values (kWh)
    pub cumulative_kwh: f64,
}

/// The three long-term statistics produced per circuit and day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    /// Cumulative energy (ever increasing)
    Energy,
    /// Actual runtime of the day (measurement)
    Runtime,
    /// Scheduled time of the day (measurement)
    Scheduled,
}

impl StatisticKind {
    pub fn unit(self) -> &'static str {
        match self {
            Self::Energy => "kWh",
            Self::Runtime | Self::Scheduled => "h",
        }
    }

    /// Stable statistic identifier, e.g. `boost_energy_total`
    pub fn statistic_id(self, circuit: Circuit) -> String {
        let suffix = match self {
            Self::Energy => "energy_total",
            Self::Runtime => "runtime_daily",
            Self::Scheduled => "scheduled_daily",
        };
        format!("{}_{suffix}", circuit.as_str())
    }
}

/// A finalized statistic value ready for long-term storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub circuit: Circuit,
    pub kind: StatisticKind,
    pub report_day: NaiveDate,

    /// Anchor timestamp in the installation's local offset
    pub start: DateTime<FixedOffset>,

    /// Anchor truncated to the top of the hour (long-term statistics grid)
    pub hour_start: DateTime<Utc>,

    /// kWh for energy, hours for runtime/scheduled
    pub state: f64,

    /// Running total, only for energy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
}

/// Latest imported day for one circuit, as shown on the sensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub report_day: NaiveDate,

    /// Energy attributed to the report day (kWh)
    pub energy_kwh: f64,

    /// Cumulative energy after this day (kWh)
    pub energy_sum: f64,

    pub runtime_hours: f64,
    pub scheduled_hours: f64,
    pub anchor: DateTime<FixedOffset>,
    pub energy_source: EnergySource,
}

/// One imported day as held by the statistics store.
///
/// Values are those of the first import; later replays of the day read them
/// back instead of recomputing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDay {
    pub circuit: Circuit,
    pub report_day: NaiveDate,

    /// Energy attributed to the day (kWh)
    pub energy_kwh: f64,

    /// Energy of every imported day up to and including this one (kWh)
    pub cumulative_kwh: f64,

    pub runtime_minutes: u32,
    pub scheduled_minutes: u32,
    pub anchor: DateTime<FixedOffset>,
    pub energy_source: EnergySource,
}

impl StoredDay {
    /// Anchor truncated to the top of its UTC hour
    pub fn hour_start(&self) -> DateTime<Utc> {
        let utc = self.anchor.with_timezone(&Utc);
        utc.duration_trunc(TimeDelta::hours(1)).unwrap_or(utc)
    }

    /// Energy, runtime and scheduled statistics of the day
    pub fn records(&self) -> [StatisticRecord; 3] {
        let hour_start = self.hour_start();
        let record = |kind, state, sum| StatisticRecord {
            circuit: self.circuit,
            kind,
            report_day: self.report_day,
            start: self.anchor,
            hour_start,
            state,
            sum,
        };

        [
            record(
                StatisticKind::Energy,
                self.energy_kwh,
                Some(self.cumulative_kwh),
            ),
            record(
                StatisticKind::Runtime,
                minutes_to_hours(self.runtime_minutes),
                None,
            ),
            record(
                StatisticKind::Scheduled,
                minutes_to_hours(self.scheduled_minutes),
                None,
            ),
        ]
    }

    pub fn summary(&self) -> DailySummary {
        DailySummary {
            report_day: self.report_day,
            energy_kwh: self.energy_kwh,
            energy_sum: self.cumulative_kwh,
            runtime_hours: minutes_to_hours(self.runtime_minutes),
            scheduled_hours: minutes_to_hours(self.scheduled_minutes),
            anchor: self.anchor,
            energy_source: self.energy_source,
        }
    }
}

/// Per-entry statistics snapshot, rebuilt by every import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsState {
    pub entry_id: String,
    pub circuits: BTreeMap<Circuit, DailySummary>,
    pub generated_at: DateTime<Utc>,
}

impl StatisticsState {
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            circuits: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }

    /// Record a summary, keeping only the newest report day per circuit
    pub fn record(&mut self, circuit: Circuit, summary: DailySummary) {
        let newer_exists = self
            .circuits
            .get(&circuit)
            .is_some_and(|existing| existing.report_day > summary.report_day);
        if !newer_exists {
            self.circuits.insert(circuit, summary);
        }
    }

    pub fn summary(&self, circuit: Circuit) -> Option<&DailySummary> {
        self.circuits.get(&circuit)
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}
