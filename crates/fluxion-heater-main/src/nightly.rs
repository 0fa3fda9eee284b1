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

//! Nightly trigger loop.

use chrono::{DateTime, Days, NaiveTime, Utc};
use chrono_tz::Tz;
use fluxion_heater_core::{StatisticsImporter, resolve_local};
use fluxion_heater_types::FoldPolicy;
use futures_timer::Delay;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::app::log_report;

/// Next occurrence of the local `trigger` time strictly after `now`
pub fn next_trigger(now: DateTime<Utc>, trigger: NaiveTime, tz: Tz) -> DateTime<Tz> {
    let policy = FoldPolicy::Earliest;
    let today = now.with_timezone(&tz).date_naive();

    let candidate = resolve_local(tz, today.and_time(trigger), policy);
    if candidate.with_timezone(&Utc) > now {
        return candidate;
    }

    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    resolve_local(tz, tomorrow.and_time(trigger), policy)
}

/// Run the importer once per day at `trigger` local time, forever.
///
/// A failed run is logged and retried at the next trigger.
pub async fn run_nightly(
    importer: Arc<StatisticsImporter>,
    trigger: NaiveTime,
    run_on_startup: bool,
) {
    let tz = importer.settings().timezone;
    info!("🌙 Nightly statistics import scheduled daily at {trigger} ({tz})");

    if run_on_startup {
        debug!("Running initial statistics import...");
        run_and_log(&importer).await;
    }

    loop {
        let now = Utc::now();
        let next = next_trigger(now, trigger, tz);
        let sleep_duration = (next.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::from_secs(3600));

        info!(
            "💤 Statistics importer: sleeping until {} ({} seconds)",
            next.format("%Y-%m-%d %H:%M:%S %Z"),
            sleep_duration.as_secs()
        );
        Delay::new(sleep_duration).await;

        importer.cancellation().reset();
        run_and_log(&importer).await;
    }
}

async fn run_and_log(importer: &StatisticsImporter) {
    match importer.run().await {
        Ok(report) => log_report(&report),
        Err(e) => error!("❌ Nightly statistics import failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Prague;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn five_past_midnight() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 5, 0).unwrap()
    }

    #[test]
    fn test_next_trigger_after_local_midnight() {
        // 23:50 UTC on the 14th is 00:50 CET on the 15th, past that day's trigger
        let next = next_trigger(utc("2024-01-14T23:50:00Z"), five_past_midnight(), Prague);
        assert_eq!(next.with_timezone(&Utc), utc("2024-01-15T23:05:00Z"));

        // 22:00 UTC is 23:00 CET, the trigger is five minutes after midnight
        let next = next_trigger(utc("2024-01-14T22:00:00Z"), five_past_midnight(), Prague);
        assert_eq!(next.with_timezone(&Utc), utc("2024-01-14T23:05:00Z"));
    }

    #[test]
    fn test_exact_trigger_moves_to_tomorrow() {
        let next = next_trigger(utc("2024-01-14T23:05:00Z"), five_past_midnight(), Prague);
        assert_eq!(next.with_timezone(&Utc), utc("2024-01-15T23:05:00Z"));
    }

    #[test]
    fn test_trigger_inside_dst_gap_still_fires() {
        // 02:30 does not exist on 2024-03-10 in New York
        let trigger = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let next = next_trigger(utc("2024-03-10T05:00:00Z"), trigger, New_York);
        assert_eq!(next.with_timezone(&Utc), utc("2024-03-10T07:00:00Z"));
    }
}
