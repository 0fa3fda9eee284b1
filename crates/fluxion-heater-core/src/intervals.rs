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

//! ON intervals of a single calendar day.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta};
use chrono_tz::Tz;
use fluxion_heater_types::{FoldPolicy, MINUTES_PER_DAY, TransitionKind};

use crate::schedule::CanonicalProgram;
use crate::timezone::resolve_local;

/// One contiguous ON stretch in local time. `end` may fall on the next date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DayInterval {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> u32 {
        u32::try_from(self.duration().num_minutes()).unwrap_or(0)
    }

    pub fn midpoint(&self) -> DateTime<Tz> {
        self.start + self.duration() / 2
    }

    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

/// Build the ordered ON intervals of `date`.
///
/// A leading OFF closes the interval carried over from the previous date and
/// is not repeated here. A trailing ON runs into the next weekday's first
/// transition when that is an OFF, otherwise until local midnight. The total
/// duration of a date never exceeds 24 hours.
pub fn day_intervals(
    program: &CanonicalProgram,
    date: NaiveDate,
    tz: Tz,
    policy: FoldPolicy,
) -> Vec<DayInterval> {
    let weekday = date.weekday();
    let midnight = date.and_time(NaiveTime::MIN);
    let at = |minutes: u32| {
        resolve_local(tz, midnight + TimeDelta::minutes(i64::from(minutes)), policy)
    };

    let mut intervals = Vec::new();
    let mut budget = TimeDelta::minutes(i64::from(MINUTES_PER_DAY));
    let mut open: Option<u32> = None;

    let mut push = |start: DateTime<Tz>, end: DateTime<Tz>, budget: &mut TimeDelta| {
        let end = end.min(start + *budget);
        if end > start {
            *budget -= end - start;
            intervals.push(DayInterval { start, end });
        }
    };

    for transition in program.day(weekday) {
        let offset = u32::from(transition.offset_minutes);
        match transition.kind {
            TransitionKind::On => {
                if open.is_none() {
                    open = Some(offset);
                }
            }
            TransitionKind::Off => {
                // Without an open ON this closes yesterday's carry
                if let Some(start) = open.take() {
                    push(at(start), at(offset), &mut budget);
                }
            }
            TransitionKind::Sentinel => {}
        }
    }

    if let Some(start) = open {
        let day_end = u32::from(MINUTES_PER_DAY);
        let end = program
            .first_of(weekday.succ())
            .filter(|next| next.kind == TransitionKind::Off)
            .map_or(day_end, |next| day_end + u32::from(next.offset_minutes));
        push(at(start), at(end), &mut budget);
    }

    intervals
}

/// Total scheduled minutes across `intervals`
pub fn scheduled_minutes(intervals: &[DayInterval]) -> u32 {
    intervals.iter().map(DayInterval::duration_minutes).sum()
}
