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
use std::fmt;
use std::str::FromStr;

/// Heating elements of a dual-circuit water heater.
/// Each circuit has its own weekly program and its own statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Circuit {
    /// Main element (wire index 1)
    Primary,
    /// Boost element (wire index 2)
    Boost,
}

impl Circuit {
    /// Index used by the controller protocol for this circuit
    pub fn wire_index(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Boost => 2,
        }
    }

    /// Map a protocol circuit index back to a circuit
    pub fn from_wire_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Primary),
            2 => Some(Self::Boost),
            _ => None,
        }
    }

    /// Config/storage key (lowercase)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Boost => "boost",
        }
    }

    /// Get human-readable name for the circuit
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Boost => "Boost",
        }
    }

    /// List all circuits
    pub fn all() -> &'static [Circuit] {
        &[Self::Primary, Self::Boost]
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Circuit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "primary" | "1" => Ok(Self::Primary),
            "boost" | "2" => Ok(Self::Boost),
            _ => Err(anyhow::anyhow!(
                "Unknown circuit: '{}'. Supported circuits: {}",
                s,
                Self::all()
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_index_mapping() {
        for circuit in Circuit::all() {
            assert_eq!(
                Circuit::from_wire_index(circuit.wire_index()),
                Some(*circuit)
            );
        }
        assert_eq!(Circuit::from_wire_index(0), None);
        assert_eq!(Circuit::from_wire_index(3), None);
    }

    #[test]
    fn test_parse_circuit() {
        assert_eq!("Boost".parse::<Circuit>().unwrap(), Circuit::Boost);
        assert_eq!("1".parse::<Circuit>().unwrap(), Circuit::Primary);
        assert!("tertiary".parse::<Circuit>().is_err());
    }
}
