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

//! Nightly statistics import pipeline for a dual-circuit water heater.
//!
//! Leaf-first: [`timezone`] maps samples to report days, [`schedule`] and
//! [`intervals`] turn raw weekly programs into ON intervals, [`anchor`] and
//! [`calibration`] derive placement and energy, and [`importer`] drives the
//! whole run against the collaborators declared in [`traits`].

pub mod anchor;
pub mod calibration;
pub mod error;
pub mod importer;
pub mod intervals;
pub mod pacer;
pub mod schedule;
pub mod timezone;
pub mod traits;

pub use anchor::{AnchorFallback, choose_anchor, safe_anchor_datetime};
pub use calibration::calibrate;
pub use error::{ImportError, Result, SampleError};
pub use importer::{
    CancellationFlag, ImportAnomaly, ImportPhase, ImportReport, StatisticsImporter,
    StatisticsStateHandle,
};
pub use intervals::{DayInterval, day_intervals, scheduled_minutes};
pub use pacer::{MAX_REQUESTS_PER_SECOND, RequestPacer};
pub use schedule::{
    CanonicalProgram, NormalizedProgram, ScheduleAnomaly, canonicalize_weekly,
    canonicalize_weekly_with_report,
};
pub use timezone::{report_day_for_sample, resolve_local};
pub use traits::{
    CommitOutcome, DayCommit, HistorySource, ProgramSource, StatisticsNotifier, StatisticsStore,
};
