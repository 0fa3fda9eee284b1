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

//! Placement of a day's statistics on the timeline.

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use fluxion_heater_types::{AnchorStrategy, FoldPolicy};

use crate::intervals::DayInterval;
use crate::timezone::resolve_local;

const LAST_INSTANT_OF_DAY: NaiveTime = match NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

/// Where to put the anchor when a day had no scheduled activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorFallback {
    pub report_day: NaiveDate,
    pub default_time: NaiveTime,
    pub tz: Tz,
    pub fold_policy: FoldPolicy,
}

/// Pick the representative timestamp of a day.
///
/// Uses the longest interval (earliest wins a tie) and the requested point of
/// it; with no intervals the configured default time of the report day.
pub fn choose_anchor(
    intervals: &[DayInterval],
    strategy: AnchorStrategy,
    fallback: &AnchorFallback,
) -> DateTime<Tz> {
    let mut longest: Option<&DayInterval> = None;
    for interval in intervals {
        if longest.is_none_or(|best| interval.duration() > best.duration()) {
            longest = Some(interval);
        }
    }

    match longest {
        Some(interval) => match strategy {
            AnchorStrategy::Start => interval.start,
            AnchorStrategy::End => interval.end,
            AnchorStrategy::Midpoint => interval.midpoint(),
        },
        None => safe_anchor_datetime(
            fallback.report_day,
            fallback.default_time,
            fallback.tz,
            fallback.fold_policy,
        ),
    }
}

/// Local midnight of `report_day` plus `time` as an absolute offset, clamped
/// into the report day.
pub fn safe_anchor_datetime(
    report_day: NaiveDate,
    time: NaiveTime,
    tz: Tz,
    policy: FoldPolicy,
) -> DateTime<Tz> {
    let midnight = resolve_local(tz, report_day.and_time(NaiveTime::MIN), policy);
    let last = resolve_local(tz, report_day.and_time(LAST_INSTANT_OF_DAY), policy);

    let candidate = midnight + (time - NaiveTime::MIN);
    candidate.clamp(midnight, last.max(midnight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Timelike, Utc};
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Prague;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        resolve_local(
            Prague,
            date(y, m, d).and_hms_opt(h, min, 0).unwrap(),
            FoldPolicy::Earliest,
        )
    }

    fn interval(start: DateTime<Tz>, minutes: i64) -> DayInterval {
        DayInterval {
            start,
            end: start + TimeDelta::minutes(minutes),
        }
    }

    fn fallback(time: NaiveTime) -> AnchorFallback {
        AnchorFallback {
            report_day: date(2024, 3, 3),
            default_time: time,
            tz: Prague,
            fold_policy: FoldPolicy::Earliest,
        }
    }

    #[test]
    fn test_midpoint_of_longest_interval() {
        let intervals = [
            interval(local(2024, 3, 3, 0, 30), 60),
            interval(local(2024, 3, 3, 1, 45), 420),
            interval(local(2024, 3, 3, 20, 0), 120),
        ];
        let anchor = choose_anchor(
            &intervals,
            AnchorStrategy::Midpoint,
            &fallback(NaiveTime::MIN),
        );

        assert_eq!(anchor, local(2024, 3, 3, 5, 15));
        assert!(intervals[1].contains(&anchor));
    }

    #[test]
    fn test_start_and_end_strategies() {
        let intervals = [interval(local(2024, 3, 3, 6, 0), 90)];
        let fb = fallback(NaiveTime::MIN);

        assert_eq!(
            choose_anchor(&intervals, AnchorStrategy::Start, &fb),
            local(2024, 3, 3, 6, 0)
        );
        assert_eq!(
            choose_anchor(&intervals, AnchorStrategy::End, &fb),
            local(2024, 3, 3, 7, 30)
        );
    }

    #[test]
    fn test_tie_prefers_earliest_interval() {
        let intervals = [
            interval(local(2024, 3, 3, 4, 0), 60),
            interval(local(2024, 3, 3, 16, 0), 60),
        ];
        let anchor = choose_anchor(
            &intervals,
            AnchorStrategy::Start,
            &fallback(NaiveTime::MIN),
        );
        assert_eq!(anchor, local(2024, 3, 3, 4, 0));
    }

    #[test]
    fn test_empty_intervals_use_default_time() {
        let time = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let anchor = choose_anchor(&[], AnchorStrategy::Midpoint, &fallback(time));
        assert_eq!(anchor, local(2024, 3, 3, 12, 0));
    }

    #[test]
    fn test_safe_anchor_stays_inside_the_day() {
        // 23:30 on the 23 h spring-forward day overflows past local midnight
        let time = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let anchor = safe_anchor_datetime(date(2024, 3, 10), time, New_York, FoldPolicy::Earliest);

        assert_eq!(anchor.date_naive(), date(2024, 3, 10));
        assert_eq!(anchor.hour(), 23);
        assert_eq!(anchor.minute(), 59);
        assert_eq!(anchor.nanosecond(), 999_999_000);
    }

    #[test]
    fn test_safe_anchor_uses_absolute_offset() {
        // Three absolute hours after midnight on the spring-forward day is 04:00 EDT
        let time = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        let anchor = safe_anchor_datetime(date(2024, 3, 10), time, New_York, FoldPolicy::Earliest);

        assert_eq!(anchor.hour(), 4);
        assert_eq!(
            anchor.with_timezone(&Utc),
            DateTime::parse_from_rfc3339("2024-03-10T08:00:00Z").unwrap()
        );
    }
}
