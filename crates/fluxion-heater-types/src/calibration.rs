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

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where the final energy figure for a day came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    /// Device-reported energy, trusted as-is
    DeviceReported,
    /// Runtime multiplied by the configured element power
    RuntimeDerived,
}

impl EnergySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceReported => "device_reported",
            Self::RuntimeDerived => "runtime_derived",
        }
    }
}

impl FromStr for EnergySource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "device_reported" => Ok(Self::DeviceReported),
            "runtime_derived" => Ok(Self::RuntimeDerived),
            _ => Err(anyhow::anyhow!("Unknown energy source: '{s}'")),
        }
    }
}

/// Outcome of reconciling device-reported energy with a runtime estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCalibration {
    /// `true` = trust the device value, `false` = use the runtime estimate
    pub use_scale: bool,

    /// ln(10) when the device value is trusted, otherwise the element power in kW
    pub scale_factor: f64,

    /// Element power used for the runtime estimate (W)
    pub fallback_power_watts: f64,

    /// Value reported by the device (kWh)
    pub reported_kwh: f64,

    /// runtime_hours * fallback power (kWh)
    pub derived_kwh: f64,

    /// Energy that goes into the statistics (kWh)
    pub energy_kwh: f64,
}

impl EnergyCalibration {
    pub fn source(&self) -> EnergySource {
        if self.use_scale {
            EnergySource::DeviceReported
        } else {
            EnergySource::RuntimeDerived
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_source_names() {
        for source in [EnergySource::DeviceReported, EnergySource::RuntimeDerived] {
            assert_eq!(source.as_str().parse::<EnergySource>().unwrap(), source);
        }
        assert!("device".parse::<EnergySource>().is_err());
    }
}
