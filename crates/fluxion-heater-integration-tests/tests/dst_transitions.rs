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

//! Nightly imports across US daylight-saving transitions.

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use fluxion_heater_core::ImportPhase;
use fluxion_heater_integration_tests::{DumpFixture, ENTRY_ID, date, history_row, program_block};
use fluxion_heater_types::{Circuit, StatisticKind, StatisticRecord};
use serde_json::Value;

/// Primary runs Sunday 01:00-03:00 local, the window that DST transitions cut
/// into; boost has no scheduled activity at all
fn write_programs(fixture: &DumpFixture) {
    let none: &[(u16, u8)] = &[];
    fixture
        .write_programs(&[
            program_block(
                Circuit::Primary,
                [none, none, none, none, none, none, &[(60, 1), (180, 0)]],
            ),
            program_block(Circuit::Boost, [none; 7]),
        ])
        .unwrap();
}

fn nights(days: &[(i32, u32, u32)]) -> Vec<Value> {
    days.iter()
        .map(|&(y, m, d)| history_row(New_York, date(y, m, d), (0.0, 90), (0.0, 0)))
        .collect()
}

fn scheduled<'a>(records: &'a [StatisticRecord], day: (i32, u32, u32)) -> &'a StatisticRecord {
    records
        .iter()
        .find(|r| {
            r.circuit == Circuit::Primary
                && r.kind == StatisticKind::Scheduled
                && r.report_day == date(day.0, day.1, day.2)
        })
        .unwrap()
}

fn utc(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

#[tokio::test]
async fn test_spring_forward_day_is_imported_exactly_once() {
    let fixture = DumpFixture::new().unwrap();
    write_programs(&fixture);
    fixture
        .write_history(0, &nights(&[(2024, 3, 9), (2024, 3, 10), (2024, 3, 11)]))
        .unwrap();

    let store = fixture.open_store().unwrap();
    let (importer, _updates) = fixture.importer(store.clone(), New_York);

    let report = importer.run().await.unwrap();
    assert_eq!(report.phase, ImportPhase::Completed);
    assert_eq!(report.skipped, 0);

    // Both circuits, three consecutive days, no gap and no repeat
    assert_eq!(report.imported, 6);
    assert_eq!(
        store.read_imported_days(ENTRY_ID, Circuit::Primary).unwrap(),
        vec![date(2024, 3, 9), date(2024, 3, 10), date(2024, 3, 11)]
    );

    // 01:00 EST to 03:00 EDT is one real hour
    let sunday = scheduled(&report.records, (2024, 3, 10));
    assert!((sunday.state - 1.0).abs() < 1e-9);
    assert_eq!(sunday.start, utc("2024-03-10T06:30:00Z"));
    assert_eq!(sunday.hour_start, utc("2024-03-10T06:00:00Z"));

    let saturday = scheduled(&report.records, (2024, 3, 9));
    assert!(saturday.state.abs() < 1e-9);

    let primary = store.read_total(ENTRY_ID, Circuit::Primary).unwrap().unwrap();
    assert_eq!(primary.report_date, date(2024, 3, 11));
    assert!((primary.cumulative_kwh - 3.0 * 4.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_fall_back_day_counts_the_repeated_hour() {
    let fixture = DumpFixture::new().unwrap();
    write_programs(&fixture);
    fixture
        .write_history(0, &nights(&[(2024, 11, 2), (2024, 11, 3), (2024, 11, 4)]))
        .unwrap();

    let store = fixture.open_store().unwrap();
    let (importer, _updates) = fixture.importer(store.clone(), New_York);

    let report = importer.run().await.unwrap();
    assert_eq!(report.imported, 6);
    assert_eq!(
        store.read_imported_days(ENTRY_ID, Circuit::Boost).unwrap(),
        vec![date(2024, 11, 2), date(2024, 11, 3), date(2024, 11, 4)]
    );

    // 01:00 EDT (first occurrence) to 03:00 EST is three real hours
    let sunday = scheduled(&report.records, (2024, 11, 3));
    assert!((sunday.state - 3.0).abs() < 1e-9);
    assert_eq!(sunday.start, utc("2024-11-03T06:30:00Z"));

    // Replaying the same nights is a no-op
    let replay = importer.run().await.unwrap();
    assert_eq!(replay.imported, 0);
    assert_eq!(replay.duplicates, 6);
}
