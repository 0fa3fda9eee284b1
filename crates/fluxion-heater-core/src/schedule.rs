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

//! Weekly program normalization.
//!
//! Raw programs arrive unsorted, padded with sentinel slots and occasionally with
//! two ON (or two OFF) transitions in a row. The canonical form is sorted by
//! offset, sentinel-free and strictly alternating.

use chrono::Weekday;
use fluxion_heater_types::{
    MINUTES_PER_DAY, Transition, TransitionKind, WeeklyProgram, weekday_index,
};
use tracing::warn;

/// Problem found and repaired while normalizing a weekly program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAnomaly {
    /// A transition repeated the kind of the one before it and was dropped
    DuplicateKind {
        weekday: Weekday,
        offset_minutes: u16,
        kind: TransitionKind,
    },
    /// A non-sentinel transition pointed past the end of the day and was dropped
    OffsetOutOfRange { weekday: Weekday, offset_minutes: u16 },
}

/// Weekly program in canonical form.
///
/// Only [`canonicalize_weekly`] builds one, so every day is sorted, free of
/// sentinels, within `[0, 1439]` and alternating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalProgram {
    days: [Vec<Transition>; 7],
}

impl CanonicalProgram {
    pub fn day(&self, weekday: Weekday) -> &[Transition] {
        self.days
            .get(weekday_index(weekday))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First transition of a weekday, if any
    pub fn first_of(&self, weekday: Weekday) -> Option<&Transition> {
        self.day(weekday).first()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }
}

impl From<&CanonicalProgram> for WeeklyProgram {
    fn from(program: &CanonicalProgram) -> Self {
        WeeklyProgram::from_days(program.days.clone())
    }
}

/// Canonical program together with everything that had to be repaired
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedProgram {
    pub program: CanonicalProgram,
    pub anomalies: Vec<ScheduleAnomaly>,
}

/// Normalize a raw weekly program, discarding the anomaly list
pub fn canonicalize_weekly(raw: &WeeklyProgram) -> CanonicalProgram {
    canonicalize_weekly_with_report(raw).program
}

/// Normalize a raw weekly program and report what was repaired
pub fn canonicalize_weekly_with_report(raw: &WeeklyProgram) -> NormalizedProgram {
    let mut normalized = NormalizedProgram::default();

    for (weekday, transitions) in raw.days() {
        let day = canonicalize_day(weekday, transitions, &mut normalized.anomalies);
        if let Some(slot) = normalized.program.days.get_mut(weekday_index(weekday)) {
            *slot = day;
        }
    }

    normalized
}

fn canonicalize_day(
    weekday: Weekday,
    transitions: &[Transition],
    anomalies: &mut Vec<ScheduleAnomaly>,
) -> Vec<Transition> {
    let mut usable: Vec<Transition> = Vec::with_capacity(transitions.len());
    for transition in transitions.iter().filter(|t| !t.is_sentinel()) {
        if transition.offset_minutes >= MINUTES_PER_DAY {
            warn!(
                "⚠️ Dropping {weekday} transition at offset {} (past end of day)",
                transition.offset_minutes
            );
            anomalies.push(ScheduleAnomaly::OffsetOutOfRange {
                weekday,
                offset_minutes: transition.offset_minutes,
            });
            continue;
        }
        usable.push(*transition);
    }

    // Stable, so equal offsets keep their wire order
    usable.sort_by_key(|t| t.offset_minutes);

    let mut canonical: Vec<Transition> = Vec::with_capacity(usable.len());
    for transition in usable {
        if canonical.last().is_some_and(|last| last.kind == transition.kind) {
            warn!(
                "⚠️ Dropping duplicate {:?} transition on {weekday} at minute {}",
                transition.kind, transition.offset_minutes
            );
            anomalies.push(ScheduleAnomaly::DuplicateKind {
                weekday,
                offset_minutes: transition.offset_minutes,
                kind: transition.kind,
            });
            continue;
        }
        canonical.push(transition);
    }

    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_alternating(day: &[Transition]) -> bool {
        day.windows(2).all(|pair| match pair {
            [a, b] => a.kind != b.kind && a.offset_minutes <= b.offset_minutes,
            _ => true,
        })
    }

    fn messy_program() -> WeeklyProgram {
        WeeklyProgram::new()
            .with_day(
                Weekday::Mon,
                vec![
                    Transition::off(600),
                    Transition::sentinel(),
                    Transition::on(360),
                    Transition::on(1200),
                    Transition::off(1380),
                    Transition::sentinel(),
                ],
            )
            .with_day(Weekday::Tue, vec![Transition::off(30), Transition::on(2000)])
            .with_day(
                Weekday::Sun,
                vec![Transition::sentinel(), Transition::sentinel()],
            )
    }

    #[test]
    fn test_sorts_and_drops_sentinels() {
        let canonical = canonicalize_weekly(&messy_program());

        assert_eq!(
            canonical.day(Weekday::Mon),
            &[
                Transition::on(360),
                Transition::off(600),
                Transition::on(1200),
                Transition::off(1380),
            ]
        );
        assert!(canonical.day(Weekday::Sun).is_empty());
        assert!(canonical.day(Weekday::Wed).is_empty());
    }

    #[test]
    fn test_duplicate_on_is_dropped_with_anomaly() {
        let raw = WeeklyProgram::new().with_day(
            Weekday::Wed,
            vec![
                Transition::on(60),
                Transition::on(120),
                Transition::off(180),
            ],
        );

        let normalized = canonicalize_weekly_with_report(&raw);

        assert_eq!(
            normalized.program.day(Weekday::Wed),
            &[Transition::on(60), Transition::off(180)]
        );
        assert_eq!(
            normalized.anomalies,
            vec![ScheduleAnomaly::DuplicateKind {
                weekday: Weekday::Wed,
                offset_minutes: 120,
                kind: TransitionKind::On,
            }]
        );
    }

    #[test]
    fn test_out_of_range_offset_is_dropped() {
        let normalized = canonicalize_weekly_with_report(&messy_program());

        assert_eq!(normalized.program.day(Weekday::Tue), &[Transition::off(30)]);
        assert!(normalized.anomalies.contains(&ScheduleAnomaly::OffsetOutOfRange {
            weekday: Weekday::Tue,
            offset_minutes: 2000,
        }));
    }

    #[test]
    fn test_leading_off_is_kept() {
        let canonical = canonicalize_weekly(&messy_program());
        assert_eq!(canonical.first_of(Weekday::Tue), Some(&Transition::off(30)));
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize_weekly(&messy_program());
        let twice = canonicalize_weekly_with_report(&WeeklyProgram::from(&once));

        assert_eq!(once, twice.program);
        assert!(twice.anomalies.is_empty());

        for (_, day) in WeeklyProgram::from(&once).days() {
            assert!(day.iter().all(|t| !t.is_sentinel()));
            assert!(is_alternating(day));
        }
    }

    #[test]
    fn test_empty_program_stays_empty() {
        let canonical = canonicalize_weekly(&WeeklyProgram::new());
        assert!(canonical.is_empty());
    }
}
