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

//! UTC sample timestamps to local report days.

use chrono::{
    DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use fluxion_heater_types::FoldPolicy;

/// Longest stretch of wall clock searched for the end of a DST gap
const MAX_GAP_MINUTES: u32 = 48 * 60;

/// Resolve a local wall time in `tz`.
///
/// Ambiguous times (DST fold) follow `policy`. Non-existent times (DST gap)
/// move forward to the first valid instant after the gap.
pub fn resolve_local(tz: Tz, naive: NaiveDateTime, policy: FoldPolicy) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, latest) => match policy {
            FoldPolicy::Earliest => earliest,
            FoldPolicy::Latest => latest,
        },
        LocalResult::None => first_instant_after_gap(tz, naive),
    }
}

fn first_instant_after_gap(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    // Transitions happen on whole minutes
    let mut candidate = naive
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(naive);

    for _ in 0..MAX_GAP_MINUTES {
        candidate += TimeDelta::minutes(1);
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return dt;
        }
    }

    tz.from_utc_datetime(&naive)
}

/// Local calendar day a sample reports on.
///
/// The controller stamps a sample shortly after local midnight, so the report
/// day is the local wall time minus one calendar day. Subtraction happens on
/// the wall clock, not as 86400 s, so 23 h and 25 h days map correctly.
pub fn report_day_for_sample(timestamp: DateTime<Utc>, tz: Tz, policy: FoldPolicy) -> NaiveDate {
    let local = timestamp.with_timezone(&tz).naive_local();
    let previous = local.checked_sub_days(Days::new(1)).unwrap_or(local);

    resolve_local(tz, previous, policy).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Prague;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_day_mapping() {
        // 00:10 CET on 2024-01-16
        let day = report_day_for_sample(
            utc("2024-01-15T23:10:00Z"),
            Prague,
            FoldPolicy::Earliest,
        );
        assert_eq!(day, date(2024, 1, 15));
    }

    #[test]
    fn test_spring_forward_day_is_not_skipped() {
        // 00:30 EDT on 2024-03-11, the day after the 23 h day
        let day = report_day_for_sample(
            utc("2024-03-11T04:30:00Z"),
            New_York,
            FoldPolicy::Earliest,
        );
        assert_eq!(day, date(2024, 3, 10));

        // A fixed 86400 s subtraction would land on the 9th
        let naive = utc("2024-03-11T04:30:00Z") - TimeDelta::seconds(86_400);
        assert_eq!(naive.with_timezone(&New_York).date_naive(), date(2024, 3, 9));
    }

    #[test]
    fn test_gap_shifts_forward() {
        // 02:30 on 2024-03-10 does not exist in New York
        let day = report_day_for_sample(
            utc("2024-03-11T06:30:00Z"),
            New_York,
            FoldPolicy::Earliest,
        );
        assert_eq!(day, date(2024, 3, 10));

        let naive = date(2024, 3, 10).and_hms_opt(2, 30, 0).unwrap();
        let resolved = resolve_local(New_York, naive, FoldPolicy::Earliest);
        assert_eq!(
            resolved.naive_local(),
            date(2024, 3, 10).and_hms_opt(3, 0, 0).unwrap()
        );
        assert_eq!(resolved.with_timezone(&Utc), utc("2024-03-10T07:00:00Z"));
    }

    #[test]
    fn test_fold_policy() {
        let naive = date(2024, 11, 3).and_hms_opt(1, 30, 0).unwrap();
        let earliest = resolve_local(New_York, naive, FoldPolicy::Earliest);
        let latest = resolve_local(New_York, naive, FoldPolicy::Latest);

        assert_eq!(earliest.with_timezone(&Utc), utc("2024-11-03T05:30:00Z"));
        assert_eq!(latest.with_timezone(&Utc), utc("2024-11-03T06:30:00Z"));
    }

    #[test]
    fn test_fold_mapping_is_deterministic() {
        // 01:30 EST on 2024-11-04 maps back onto the ambiguous 01:30 of the 3rd
        for policy in [FoldPolicy::Earliest, FoldPolicy::Latest] {
            let first = report_day_for_sample(utc("2024-11-04T06:30:00Z"), New_York, policy);
            let second = report_day_for_sample(utc("2024-11-04T06:30:00Z"), New_York, policy);
            assert_eq!(first, date(2024, 11, 3));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_consecutive_samples_cover_every_day() {
        // One sample per night across both US transitions
        let mut previous: Option<NaiveDate> = None;
        let mut local = date(2024, 3, 1).and_hms_opt(0, 5, 0).unwrap();
        for _ in 0..270 {
            let stamp = resolve_local(New_York, local, FoldPolicy::Earliest).with_timezone(&Utc);
            let day = report_day_for_sample(stamp, New_York, FoldPolicy::Earliest);
            if let Some(prev) = previous {
                assert_eq!(prev.succ_opt().unwrap(), day);
            }
            previous = Some(day);
            local = local.checked_add_days(Days::new(1)).unwrap();
        }
    }
}
