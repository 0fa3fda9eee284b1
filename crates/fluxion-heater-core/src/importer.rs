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

//! Orchestration of a nightly (or on-demand) statistics import run.
//!
//! A run fetches weekly programs and history samples, then walks the samples in
//! timestamp order: map to a report day, analyze the schedule, calibrate the
//! energy and commit. Fetch failures abort the run before anything is written;
//! problems with a single sample skip only that sample.

use chrono::{DateTime, NaiveDate, Utc};
use fluxion_heater_types::{
    Circuit, DailySummary, HistorySample, ImporterSettings, StatisticRecord, StatisticsState,
    StoredDay, WeeklyProgram,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use crate::anchor::{AnchorFallback, choose_anchor};
use crate::calibration::calibrate;
use crate::error::{ImportError, Result, SampleError};
use crate::intervals::{day_intervals, scheduled_minutes};
use crate::pacer::RequestPacer;
use crate::schedule::{CanonicalProgram, ScheduleAnomaly, canonicalize_weekly_with_report};
use crate::timezone::report_day_for_sample;
use crate::traits::{DayCommit, HistorySource, ProgramSource, StatisticsNotifier, StatisticsStore};

/// Where an import run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportPhase {
    #[default]
    Idle,
    FetchingInputs,
    MappingDay,
    AnalyzingSchedule,
    Calibrating,
    Committing,
    Completed,
    Failed,
    Cancelled,
}

impl ImportPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingInputs => "fetching inputs",
            Self::MappingDay => "mapping day",
            Self::AnalyzingSchedule => "analyzing schedule",
            Self::Calibrating => "calibrating",
            Self::Committing => "committing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Cooperative stop signal shared between the importer and its owner.
///
/// Checked before each sample; a commit already in flight always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the next trigger runs in full
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared, read-mostly view of the latest statistics snapshot
#[derive(Debug, Clone, Default)]
pub struct StatisticsStateHandle(Arc<RwLock<Option<StatisticsState>>>);

impl StatisticsStateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<StatisticsState> {
        self.0.read().clone()
    }

    pub fn summary(&self, circuit: Circuit) -> Option<DailySummary> {
        self.0.read().as_ref()?.summary(circuit).cloned()
    }

    pub fn replace(&self, state: StatisticsState) {
        *self.0.write() = Some(state);
    }
}

/// Something that went wrong but did not stop the run
#[derive(Debug, Clone, PartialEq)]
pub enum ImportAnomaly {
    Schedule {
        circuit: Circuit,
        anomaly: ScheduleAnomaly,
    },
    Sample {
        circuit: Circuit,
        timestamp: DateTime<Utc>,
        error: SampleError,
    },
}

/// Outcome of a finished or cancelled run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub phase: ImportPhase,

    /// Days newly folded into the totals
    pub imported: usize,

    /// Days that were already imported before this run
    pub duplicates: usize,

    /// Samples skipped because of a per-sample problem
    pub skipped: usize,

    /// Later days republished because an older day was inserted before them
    pub restated: usize,

    pub anomalies: Vec<ImportAnomaly>,
    pub records: Vec<StatisticRecord>,

    /// Snapshot published on completion
    pub state: Option<StatisticsState>,
}

struct SampleOutcome {
    duplicate: bool,
    day: StoredDay,
}

/// Drives import runs for one configured entry
pub struct StatisticsImporter {
    entry_id: String,
    settings: ImporterSettings,
    programs: Arc<dyn ProgramSource>,
    history: Arc<dyn HistorySource>,
    store: Arc<dyn StatisticsStore>,
    notifier: Arc<dyn StatisticsNotifier>,
    state: StatisticsStateHandle,
    cancel: CancellationFlag,
    pacer: RequestPacer,
    phase: Mutex<ImportPhase>,
}

impl fmt::Debug for StatisticsImporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsImporter")
            .field("entry_id", &self.entry_id)
            .field("settings", &self.settings)
            .field("phase", &self.phase())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl StatisticsImporter {
    pub fn new(
        entry_id: impl Into<String>,
        settings: ImporterSettings,
        programs: Arc<dyn ProgramSource>,
        history: Arc<dyn HistorySource>,
        store: Arc<dyn StatisticsStore>,
        notifier: Arc<dyn StatisticsNotifier>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            settings,
            programs,
            history,
            store,
            notifier,
            state: StatisticsStateHandle::new(),
            cancel: CancellationFlag::new(),
            pacer: RequestPacer::default(),
            phase: Mutex::new(ImportPhase::Idle),
        }
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_state_handle(mut self, state: StatisticsStateHandle) -> Self {
        self.state = state;
        self
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn settings(&self) -> &ImporterSettings {
        &self.settings
    }

    pub fn phase(&self) -> ImportPhase {
        *self.phase.lock()
    }

    pub fn state_handle(&self) -> StatisticsStateHandle {
        self.state.clone()
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Import the most recent history window
    pub async fn run(&self) -> Result<ImportReport> {
        info!("🔥 Starting statistics import for '{}'", self.entry_id);
        self.set_phase(ImportPhase::FetchingInputs);
        self.check_settings()?;

        let programs = self.fetch_programs().await?;
        let samples = match self.history.fetch_history(&self.entry_id, 0).await {
            Ok(samples) => samples,
            Err(e) => return Err(self.fail(ImportError::FetchFailed(e))),
        };
        debug!("Fetched {} history samples", samples.len());

        self.process(&programs, samples)
    }

    /// Import `windows` history windows, newest first, respecting the request rate limit
    pub async fn backfill(&self, windows: u32) -> Result<ImportReport> {
        info!(
            "📜 Starting statistics backfill for '{}' ({windows} windows)",
            self.entry_id
        );
        self.set_phase(ImportPhase::FetchingInputs);
        self.check_settings()?;

        self.pacer.acquire().await;
        let programs = self.fetch_programs().await?;

        let mut samples = Vec::new();
        for window in 0..windows {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled(ImportReport::default()));
            }

            self.pacer.acquire().await;
            match self.history.fetch_history(&self.entry_id, window).await {
                Ok(batch) => {
                    debug!("Window {window}: {} samples", batch.len());
                    samples.extend(batch);
                }
                Err(e) => return Err(self.fail(ImportError::FetchFailed(e))),
            }
        }

        self.process(&programs, samples)
    }

    async fn fetch_programs(&self) -> Result<HashMap<Circuit, WeeklyProgram>> {
        self.programs
            .fetch_weekly_programs(&self.entry_id)
            .await
            .map_err(|e| self.fail(ImportError::FetchFailed(e)))
    }

    fn process(
        &self,
        programs: &HashMap<Circuit, WeeklyProgram>,
        mut samples: Vec<HistorySample>,
    ) -> Result<ImportReport> {
        if programs.is_empty() {
            return Err(self.fail(ImportError::NoWeeklyProgram {
                entry_id: self.entry_id.clone(),
            }));
        }

        let mut report = ImportReport::default();

        let mut canonical = HashMap::new();
        for circuit in Circuit::all().iter().copied() {
            let Some(raw) = programs.get(&circuit) else {
                continue;
            };
            let normalized = canonicalize_weekly_with_report(raw);
            report.anomalies.extend(
                normalized
                    .anomalies
                    .into_iter()
                    .map(|anomaly| ImportAnomaly::Schedule { circuit, anomaly }),
            );
            canonical.insert(circuit, normalized.program);
        }

        samples.sort_by_key(|sample| sample.timestamp);

        let mut state = StatisticsState::new(self.entry_id.clone());
        let mut published = HashSet::new();
        let mut earliest_inserted: BTreeMap<Circuit, NaiveDate> = BTreeMap::new();
        for sample in &samples {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled(report));
            }

            let program = match program_for(sample, &canonical) {
                Ok(program) => program,
                Err(error) => {
                    warn!("⚠️ Skipping sample at {}: {error}", sample.timestamp);
                    report.skipped += 1;
                    report.anomalies.push(ImportAnomaly::Sample {
                        circuit: sample.circuit,
                        timestamp: sample.timestamp,
                        error,
                    });
                    continue;
                }
            };

            let outcome = match self.import_sample(sample, program) {
                Ok(outcome) => outcome,
                Err(err) => return Err(self.publish_partial(state, &report, err)),
            };
            let day = outcome.day;
            if outcome.duplicate {
                report.duplicates += 1;
            } else {
                report.imported += 1;
                earliest_inserted
                    .entry(day.circuit)
                    .and_modify(|earliest| *earliest = (*earliest).min(day.report_day))
                    .or_insert(day.report_day);
            }
            published.insert((day.circuit, day.report_day));
            report.records.extend(day.records());
            state.record(day.circuit, day.summary());
        }

        if let Err(err) = self.restate_later_days(
            &earliest_inserted,
            &published,
            &mut state,
            &mut report,
        ) {
            return Err(self.publish_partial(state, &report, err));
        }

        state.generated_at = Utc::now();
        self.set_phase(ImportPhase::Completed);
        self.state.replace(state.clone());
        self.notifier.notify(&state, &report.records);

        info!(
            "✅ Statistics import for '{}' completed: {} imported, {} already present, {} skipped, {} restated",
            self.entry_id, report.imported, report.duplicates, report.skipped, report.restated
        );

        report.phase = ImportPhase::Completed;
        report.state = Some(state);
        Ok(report)
    }

    /// Republish stored days whose running total moved because an older day
    /// was inserted in this run
    fn restate_later_days(
        &self,
        earliest_inserted: &BTreeMap<Circuit, NaiveDate>,
        published: &HashSet<(Circuit, NaiveDate)>,
        state: &mut StatisticsState,
        report: &mut ImportReport,
    ) -> Result<()> {
        for (&circuit, &earliest) in earliest_inserted {
            let later = self
                .store
                .days_after(&self.entry_id, circuit, earliest)
                .map_err(|e| self.fail(ImportError::Store(e)))?;

            for day in later {
                if published.contains(&(circuit, day.report_day)) {
                    continue;
                }
                debug!(
                    "🔁 {circuit} {}: total restated to {:.3} kWh",
                    day.report_day, day.cumulative_kwh
                );
                report.restated += 1;
                report.records.extend(day.records());
                state.record(circuit, day.summary());
            }
        }
        Ok(())
    }

    /// Publish what was committed before a store failure, then hand back the error
    fn publish_partial(
        &self,
        mut state: StatisticsState,
        report: &ImportReport,
        err: ImportError,
    ) -> ImportError {
        if report.records.is_empty() {
            return err;
        }

        warn!(
            "⚠️ Publishing {} days committed before the failure",
            report.imported + report.duplicates
        );
        state.generated_at = Utc::now();
        self.state.replace(state.clone());
        self.notifier.notify(&state, &report.records);
        err
    }

    fn import_sample(
        &self,
        sample: &HistorySample,
        program: &CanonicalProgram,
    ) -> Result<SampleOutcome> {
        let settings = &self.settings;
        let tz = settings.timezone;
        let circuit = sample.circuit;

        self.set_phase(ImportPhase::MappingDay);
        let report_day = report_day_for_sample(sample.timestamp, tz, settings.fold_policy);

        self.set_phase(ImportPhase::AnalyzingSchedule);
        let intervals = day_intervals(program, report_day, tz, settings.fold_policy);
        let scheduled = scheduled_minutes(&intervals);
        let anchor = choose_anchor(
            &intervals,
            settings.anchor_strategy,
            &AnchorFallback {
                report_day,
                default_time: settings.default_anchor_times.for_circuit(circuit),
                tz,
                fold_policy: settings.fold_policy,
            },
        );
        if scheduled != sample.scheduled_minutes {
            debug!(
                "{circuit} {report_day}: program schedules {scheduled} min, device reported {} min",
                sample.scheduled_minutes
            );
        }

        self.set_phase(ImportPhase::Calibrating);
        let calibration = calibrate(
            sample.energy_kwh,
            sample.runtime_minutes,
            settings.fallback_power_watts,
            settings.calibration_tolerance,
        );

        self.set_phase(ImportPhase::Committing);
        let outcome = self
            .store
            .commit(
                &self.entry_id,
                circuit,
                &DayCommit {
                    report_day,
                    energy_kwh: calibration.energy_kwh,
                    runtime_minutes: sample.runtime_minutes,
                    scheduled_minutes: scheduled,
                    anchor: anchor.fixed_offset(),
                    energy_source: calibration.source(),
                },
            )
            .map_err(|e| self.fail(ImportError::Store(e)))?;

        let day = outcome.day;
        if outcome.inserted {
            info!(
                "📊 {circuit} {report_day}: {:.3} kWh ({:?}), total {:.3} kWh",
                day.energy_kwh, day.energy_source, day.cumulative_kwh
            );
        } else {
            debug!(
                "⏭️ {circuit} {report_day} already imported with {:.3} kWh, total {:.3} kWh",
                day.energy_kwh, day.cumulative_kwh
            );
        }

        Ok(SampleOutcome {
            duplicate: !outcome.inserted,
            day,
        })
    }

    fn set_phase(&self, phase: ImportPhase) {
        let mut current = self.phase.lock();
        if *current != phase {
            debug!("Import phase: {} -> {phase}", *current);
            *current = phase;
        }
    }

    fn check_settings(&self) -> Result<()> {
        let power = self.settings.fallback_power_watts;
        if !power.is_finite() || power <= 0.0 {
            return Err(self.fail(ImportError::Config(format!(
                "fallback power must be positive, got {power} W"
            ))));
        }

        let tolerance = self.settings.calibration_tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 || tolerance >= 1.0 {
            return Err(self.fail(ImportError::Config(format!(
                "calibration tolerance must be between 0 and 1, got {tolerance}"
            ))));
        }
        Ok(())
    }

    fn fail(&self, err: ImportError) -> ImportError {
        self.set_phase(ImportPhase::Failed);
        error!("❌ Statistics import for '{}' failed: {err}", self.entry_id);
        err
    }

    fn cancelled(&self, mut report: ImportReport) -> ImportReport {
        self.set_phase(ImportPhase::Cancelled);
        warn!(
            "🛑 Statistics import for '{}' cancelled after {} samples",
            self.entry_id,
            report.imported + report.duplicates
        );
        report.phase = ImportPhase::Cancelled;
        report
    }
}

fn program_for<'a>(
    sample: &HistorySample,
    programs: &'a HashMap<Circuit, CanonicalProgram>,
) -> std::result::Result<&'a CanonicalProgram, SampleError> {
    if !sample.energy_kwh.is_finite() {
        return Err(SampleError::InvalidSample {
            circuit: sample.circuit,
            reason: format!("energy {} is not a finite number", sample.energy_kwh),
        });
    }

    programs
        .get(&sample.circuit)
        .ok_or(SampleError::MissingProgram {
            circuit: sample.circuit,
        })
}
