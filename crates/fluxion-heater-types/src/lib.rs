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

//! Shared data model for the water-heater statistics importer.
//!
//! Everything in here is plain data: the raw inputs fetched from the controller
//! (history samples, weekly programs), the settings that steer a nightly run, and
//! the records the importer hands to storage and observers.

pub mod calibration;
pub mod circuit;
pub mod config;
pub mod history;
pub mod program;
pub mod statistics;

// Re-export common types for convenience
pub use calibration::{EnergyCalibration, EnergySource};
pub use circuit::Circuit;
pub use config::{AnchorStrategy, DefaultAnchorTimes, FoldPolicy, ImporterSettings};
pub use history::HistorySample;
pub use program::{
    MINUTES_PER_DAY, SENTINEL_OFFSET, Transition, TransitionKind, WeeklyProgram, weekday_index,
};
pub use statistics::{
    CumulativeTotal, DailySummary, StatisticKind, StatisticRecord, StatisticsState, StoredDay,
    minutes_to_hours,
};
