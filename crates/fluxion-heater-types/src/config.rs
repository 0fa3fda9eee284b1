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

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::circuit::Circuit;

/// Default relative tolerance for the device-scale check
pub const DEFAULT_CALIBRATION_TOLERANCE: f64 = 0.2;

/// Default element power used for runtime-derived energy (W)
pub const DEFAULT_FALLBACK_POWER_WATTS: f64 = 3000.0;

/// Which point of the chosen schedule interval a day's statistics are placed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStrategy {
    #[default]
    Midpoint,
    Start,
    End,
}

impl fmt::Display for AnchorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Midpoint => "midpoint",
            Self::Start => "start",
            Self::End => "end",
        };
        write!(f, "{name}")
    }
}

impl FromStr for AnchorStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "midpoint" => Ok(Self::Midpoint),
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            _ => Err(anyhow::anyhow!(
                "Unknown anchor strategy: '{s}'. Supported: midpoint, start, end"
            )),
        }
    }
}

/// How an ambiguous local time (DST fall-back) is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldPolicy {
    /// First occurrence of the repeated wall time
    #[default]
    Earliest,
    /// Second occurrence of the repeated wall time
    Latest,
}

impl FromStr for FoldPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            _ => Err(anyhow::anyhow!(
                "Unknown fold policy: '{s}'. Supported: earliest, latest"
            )),
        }
    }
}

/// Local time of day used as the anchor when a circuit had no scheduled activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAnchorTimes {
    pub primary: NaiveTime,
    pub boost: NaiveTime,
}

impl DefaultAnchorTimes {
    pub fn for_circuit(&self, circuit: Circuit) -> NaiveTime {
        match circuit {
            Circuit::Primary => self.primary,
            Circuit::Boost => self.boost,
        }
    }
}

impl Default for DefaultAnchorTimes {
    fn default() -> Self {
        Self {
            primary: NaiveTime::MIN,
            boost: NaiveTime::MIN,
        }
    }
}

/// Settings that steer a single statistics import run
#[derive(Debug, Clone, PartialEq)]
pub struct ImporterSettings {
    /// Local timezone of the installation
    pub timezone: Tz,

    /// Placement of the daily statistic within the longest ON interval
    pub anchor_strategy: AnchorStrategy,

    /// Element power used to derive energy from runtime (W)
    pub fallback_power_watts: f64,

    /// Relative tolerance for the ln(10) device-scale check
    pub calibration_tolerance: f64,

    /// Anchors used when a day has no schedule intervals
    pub default_anchor_times: DefaultAnchorTimes,

    /// DST fold resolution
    pub fold_policy: FoldPolicy,
}

impl Default for ImporterSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            anchor_strategy: AnchorStrategy::default(),
            fallback_power_watts: DEFAULT_FALLBACK_POWER_WATTS,
            calibration_tolerance: DEFAULT_CALIBRATION_TOLERANCE,
            default_anchor_times: DefaultAnchorTimes::default(),
            fold_policy: FoldPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importer_settings_default() {
        let settings = ImporterSettings::default();
        assert_eq!(settings.timezone, chrono_tz::UTC);
        assert_eq!(settings.anchor_strategy, AnchorStrategy::Midpoint);
        assert_eq!(settings.fold_policy, FoldPolicy::Earliest);
        assert!((settings.calibration_tolerance - 0.2).abs() < f64::EPSILON);
        assert_eq!(
            settings.default_anchor_times.for_circuit(Circuit::Boost),
            NaiveTime::MIN
        );
    }

    #[test]
    fn test_parse_strategy_and_policy() {
        assert_eq!(
            "START".parse::<AnchorStrategy>().unwrap(),
            AnchorStrategy::Start
        );
        assert!("middle".parse::<AnchorStrategy>().is_err());
        assert_eq!("latest".parse::<FoldPolicy>().unwrap(), FoldPolicy::Latest);
        assert!("first".parse::<FoldPolicy>().is_err());
    }
}
