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

use chrono::{DateTime, Weekday};
use fluxion_heater_types::{Circuit, HistorySample, Transition, TransitionKind, WeeklyProgram};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{PayloadError, Result};

/// Transition slots the controller reserves per weekday
pub const SLOTS_PER_DAY: usize = 6;

/// Slots in a full weekly program (Monday..Sunday)
pub const PROGRAM_SLOTS: usize = SLOTS_PER_DAY * 7;

/// Decode the weekly program of one circuit from a schedule response.
///
/// The response is a list of blocks `{"I": <circuit index>, "D": [<slot>, ...]}`.
/// Slots are `{"O": <minute>, "T": <1 on | 0 off | 255 unused>}`, six per day
/// starting Monday. Short lists are padded with sentinels, long ones truncated,
/// and anything that is not a slot object counts as a sentinel.
pub fn decode_weekly_program(payload: &Value, circuit: Circuit) -> Result<WeeklyProgram> {
    let blocks = schedule_blocks(payload)?;
    let block = find_block(blocks, circuit)
        .ok_or_else(|| PayloadError::Shape(format!("no schedule block for {circuit} circuit")))?;
    program_from_block(block, circuit)
}

/// Decode every circuit present in a schedule response
pub fn decode_weekly_programs(payload: &Value) -> Result<HashMap<Circuit, WeeklyProgram>> {
    let blocks = schedule_blocks(payload)?;

    let mut programs = HashMap::new();
    for circuit in Circuit::all().iter().copied() {
        if let Some(block) = find_block(blocks, circuit) {
            programs.insert(circuit, program_from_block(block, circuit)?);
        }
    }
    Ok(programs)
}

fn schedule_blocks(payload: &Value) -> Result<&Vec<Value>> {
    payload
        .as_array()
        .ok_or_else(|| PayloadError::Shape("schedule response is not a list".to_owned()))
}

fn find_block(blocks: &[Value], circuit: Circuit) -> Option<&Map<String, Value>> {
    let index = u64::from(circuit.wire_index());
    blocks
        .iter()
        .filter_map(Value::as_object)
        .find(|block| block.get("I").and_then(Value::as_u64) == Some(index))
}

fn program_from_block(block: &Map<String, Value>, circuit: Circuit) -> Result<WeeklyProgram> {
    let slots = block.get("D").and_then(Value::as_array).ok_or_else(|| {
        PayloadError::Shape(format!("schedule block for {circuit} circuit has no slot list"))
    })?;

    if slots.len() > PROGRAM_SLOTS {
        debug!(
            "Truncating {circuit} program from {} to {PROGRAM_SLOTS} slots",
            slots.len()
        );
    }

    let mut transitions: Vec<Transition> =
        slots.iter().take(PROGRAM_SLOTS).map(decode_slot).collect();
    transitions.resize(PROGRAM_SLOTS, Transition::sentinel());

    let mut program = WeeklyProgram::new();
    let mut weekday = Weekday::Mon;
    for day in transitions.chunks(SLOTS_PER_DAY) {
        program.set_day(weekday, day.to_vec());
        weekday = weekday.succ();
    }
    Ok(program)
}

fn decode_slot(value: &Value) -> Transition {
    let Some(slot) = value.as_object() else {
        return Transition::sentinel();
    };

    let offset = slot
        .get("O")
        .and_then(Value::as_u64)
        .and_then(|offset| u16::try_from(offset).ok());
    let code = slot
        .get("T")
        .and_then(Value::as_u64)
        .and_then(|code| u8::try_from(code).ok());

    let (Some(offset), Some(code)) = (offset, code) else {
        return Transition::sentinel();
    };
    Transition::new(offset, TransitionKind::from_wire(code))
}

/// One day of usage for both circuits
#[derive(Debug, Deserialize)]
struct HistoryRow {
    epoch_seconds: i64,
    #[serde(default)]
    primary_energy_kwh: f64,
    #[serde(default)]
    boost_energy_kwh: f64,
    #[serde(default)]
    primary_active_minutes: u32,
    #[serde(default)]
    primary_scheduled_minutes: u32,
    #[serde(default)]
    boost_active_minutes: u32,
    #[serde(default)]
    boost_scheduled_minutes: u32,
}

/// Decode history rows; every row yields one sample per circuit
pub fn decode_history_rows(payload: &Value) -> Result<Vec<HistorySample>> {
    let rows = Vec::<HistoryRow>::deserialize(payload)?;

    let mut samples = Vec::with_capacity(rows.len() * 2);
    for row in rows {
        let timestamp = DateTime::from_timestamp(row.epoch_seconds, 0).ok_or_else(|| {
            PayloadError::Shape(format!("epoch {} is out of range", row.epoch_seconds))
        })?;

        samples.push(HistorySample::new(
            Circuit::Primary,
            timestamp,
            row.primary_energy_kwh,
            row.primary_active_minutes,
            row.primary_scheduled_minutes,
        ));
        samples.push(HistorySample::new(
            Circuit::Boost,
            timestamp,
            row.boost_energy_kwh,
            row.boost_active_minutes,
            row.boost_scheduled_minutes,
        ));
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(events: &[(u64, u64)]) -> Vec<Value> {
        let mut slots: Vec<Value> = events.iter().map(|(o, t)| json!({"O": o, "T": t})).collect();
        while slots.len() < SLOTS_PER_DAY {
            slots.push(json!({"O": 65535, "T": 255}));
        }
        slots
    }

    #[test]
    fn test_decodes_six_slots_per_day() {
        let mut slots = Vec::new();
        slots.extend(day(&[(60, 1), (120, 0)]));
        slots.extend(day(&[]));
        slots.extend(day(&[(300, 1), (360, 0), (540, 1), (600, 0)]));
        slots.extend(day(&[]));
        slots.extend(day(&[]));
        slots.extend(day(&[]));
        slots.extend(day(&[(720, 0)]));
        let payload = json!(["unexpected", {"I": 1, "D": slots}]);

        let program = decode_weekly_program(&payload, Circuit::Primary).unwrap();

        assert_eq!(program.day(Weekday::Mon)[..2], [Transition::on(60), Transition::off(120)]);
        assert!(program.day(Weekday::Mon)[2].is_sentinel());
        assert_eq!(program.day(Weekday::Wed)[3], Transition::off(600));
        assert_eq!(program.day(Weekday::Sun)[0], Transition::off(720));
        assert_eq!(program.active_transition_count(), 7);
    }

    #[test]
    fn test_short_payload_is_padded() {
        let payload = json!([{"I": 1, "D": [{"O": 45, "T": 1}, null]}]);

        let program = decode_weekly_program(&payload, Circuit::Primary).unwrap();

        assert_eq!(program.day(Weekday::Mon)[0], Transition::on(45));
        assert!(program.day(Weekday::Mon)[1].is_sentinel());
        assert_eq!(program.day(Weekday::Sun).len(), SLOTS_PER_DAY);
        assert_eq!(program.active_transition_count(), 1);
    }

    #[test]
    fn test_long_payload_is_truncated() {
        let mut slots = vec![json!("noise")];
        for i in 0..50_u64 {
            let kind = u64::from(i % 2 == 0);
            slots.push(json!({"O": (i * 5) % 1440, "T": kind}));
        }
        let payload = json!([{"I": 2, "D": slots}]);

        let program = decode_weekly_program(&payload, Circuit::Boost).unwrap();

        assert!(program.day(Weekday::Mon)[0].is_sentinel());
        assert_eq!(program.active_transition_count(), PROGRAM_SLOTS - 1);
        assert_eq!(program.days().map(|(_, d)| d.len()).sum::<usize>(), PROGRAM_SLOTS);
    }

    #[test]
    fn test_malformed_slots_become_sentinels() {
        let payload = json!([{"I": 1, "D": [{"O": 30}, {"O": -5, "T": 1}, {"O": 90, "T": 7}]}]);

        let program = decode_weekly_program(&payload, Circuit::Primary).unwrap();

        assert!(program.is_empty());
        assert_eq!(program.day(Weekday::Mon)[2].kind, TransitionKind::Sentinel);
    }

    #[test]
    fn test_invalid_shapes_are_rejected() {
        let not_a_list = json!([{"I": 1, "D": "not-a-list"}]);
        assert!(matches!(
            decode_weekly_program(&not_a_list, Circuit::Primary),
            Err(PayloadError::Shape(_))
        ));

        let missing = json!([]);
        assert!(matches!(
            decode_weekly_program(&missing, Circuit::Primary),
            Err(PayloadError::Shape(_))
        ));

        assert!(matches!(
            decode_weekly_programs(&json!({"I": 1})),
            Err(PayloadError::Shape(_))
        ));
    }

    #[test]
    fn test_decodes_all_present_circuits() {
        let payload = json!([
            {"I": 2, "D": [{"O": 105, "T": 1}, {"O": 525, "T": 0}]},
            {"I": 9, "D": []}
        ]);

        let programs = decode_weekly_programs(&payload).unwrap();

        assert_eq!(programs.len(), 1);
        assert_eq!(programs[&Circuit::Boost].active_transition_count(), 2);
    }

    #[test]
    fn test_history_rows_yield_sample_per_circuit() {
        let payload = json!([
            {
                "epoch_seconds": 1_709_507_100,
                "primary_energy_kwh": 4.5,
                "boost_energy_kwh": 2.302585,
                "primary_active_minutes": 90,
                "primary_scheduled_minutes": 120,
                "boost_active_minutes": 60,
                "boost_scheduled_minutes": 420
            },
            {"epoch_seconds": 1_709_593_500}
        ]);

        let samples = decode_history_rows(&payload).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].circuit, Circuit::Primary);
        assert_eq!(samples[0].runtime_minutes, 90);
        assert_eq!(samples[1].circuit, Circuit::Boost);
        assert_eq!(samples[1].scheduled_minutes, 420);
        assert_eq!(samples[1].timestamp.to_rfc3339(), "2024-03-03T23:05:00+00:00");
        assert!(samples[3].energy_kwh.abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_rows_reject_bad_input() {
        assert!(matches!(
            decode_history_rows(&json!([{"primary_energy_kwh": 1.0}])),
            Err(PayloadError::Json(_))
        ));
        assert!(matches!(
            decode_history_rows(&json!([{"epoch_seconds": i64::MAX}])),
            Err(PayloadError::Shape(_))
        ));
    }
}
