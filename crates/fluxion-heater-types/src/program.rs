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

//! Raw weekly on/off programs as reported by the controller.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Minutes in one calendar day (wall clock)
pub const MINUTES_PER_DAY: u16 = 1440;

/// Offset the controller uses to pad unused transition slots
pub const SENTINEL_OFFSET: u16 = 65535;

/// Kind of a schedule transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Circuit switches on
    On,
    /// Circuit switches off
    Off,
    /// Unused slot
    Sentinel,
}

impl TransitionKind {
    /// Decode the protocol `T` field (1 = on, 0 = off, anything else = unused)
    pub fn from_wire(code: u8) -> Self {
        match code {
            1 => Self::On,
            0 => Self::Off,
            _ => Self::Sentinel,
        }
    }

    /// Protocol `T` value for this kind
    pub fn wire_code(self) -> u8 {
        match self {
            Self::On => 1,
            Self::Off => 0,
            Self::Sentinel => 255,
        }
    }
}

/// A single on/off switch point within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    /// Minutes since local midnight
    pub offset_minutes: u16,
    pub kind: TransitionKind,
}

impl Transition {
    pub const fn new(offset_minutes: u16, kind: TransitionKind) -> Self {
        Self {
            offset_minutes,
            kind,
        }
    }

    pub const fn on(offset_minutes: u16) -> Self {
        Self::new(offset_minutes, TransitionKind::On)
    }

    pub const fn off(offset_minutes: u16) -> Self {
        Self::new(offset_minutes, TransitionKind::Off)
    }

    pub const fn sentinel() -> Self {
        Self::new(SENTINEL_OFFSET, TransitionKind::Sentinel)
    }

    /// Padding slot, either by kind or by the conventional 65535 offset
    pub fn is_sentinel(&self) -> bool {
        self.kind == TransitionKind::Sentinel || self.offset_minutes == SENTINEL_OFFSET
    }
}

/// Position of a weekday in a Monday-first week (0..=6)
pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

/// Raw weekly program for one circuit.
///
/// One transition list per weekday, Monday first. Lists may be unsorted, padded
/// with sentinels or otherwise malformed; the importer normalizes them before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyProgram {
    days: [Vec<Transition>; 7],
}

impl WeeklyProgram {
    /// Create an empty program (no scheduled activity on any day)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-weekday transition lists, Monday first
    pub fn from_days(days: [Vec<Transition>; 7]) -> Self {
        Self { days }
    }

    /// Builder-style setter for a single weekday
    #[must_use]
    pub fn with_day(mut self, weekday: Weekday, transitions: Vec<Transition>) -> Self {
        self.set_day(weekday, transitions);
        self
    }

    pub fn set_day(&mut self, weekday: Weekday, transitions: Vec<Transition>) {
        if let Some(slot) = self.days.get_mut(weekday_index(weekday)) {
            *slot = transitions;
        }
    }

    /// Transitions for a weekday in their raw order
    pub fn day(&self, weekday: Weekday) -> &[Transition] {
        self.days
            .get(weekday_index(weekday))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate weekdays Monday..Sunday with their transitions
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &[Transition])> {
        let mut weekday = Weekday::Mon;
        self.days.iter().map(move |transitions| {
            let current = weekday;
            weekday = weekday.succ();
            (current, transitions.as_slice())
        })
    }

    /// Number of non-sentinel transitions across the week
    pub fn active_transition_count(&self) -> usize {
        self.days
            .iter()
            .flatten()
            .filter(|transition| !transition.is_sentinel())
            .count()
    }

    /// True when no day has any usable transition
    pub fn is_empty(&self) -> bool {
        self.active_transition_count() == 0
    }
}
