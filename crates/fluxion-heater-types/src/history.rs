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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;

/// One daily usage sample for a single circuit, as fetched from the controller.
///
/// The controller stamps each sample shortly after local midnight; the day it
/// describes is the one that just finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub circuit: Circuit,

    /// When the controller produced the sample
    pub timestamp: DateTime<Utc>,

    /// Energy reported by the device (kWh, possibly in a scaled unit)
    pub energy_kwh: f64,

    /// Minutes the element actually ran
    pub runtime_minutes: u32,

    /// Minutes the device considered scheduled
    pub scheduled_minutes: u32,
}

impl HistorySample {
    pub fn new(
        circuit: Circuit,
        timestamp: DateTime<Utc>,
        energy_kwh: f64,
        runtime_minutes: u32,
        scheduled_minutes: u32,
    ) -> Self {
        Self {
            circuit,
            timestamp,
            energy_kwh,
            runtime_minutes,
            scheduled_minutes,
        }
    }
}
