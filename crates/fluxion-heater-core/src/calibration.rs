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

use fluxion_heater_types::EnergyCalibration;
use std::f64::consts::LN_10;

/// Reconcile device-reported energy with a runtime-based estimate.
///
/// The device value is trusted when its ratio to the estimate lies within
/// `tolerance` (relative) of ln(10); otherwise the estimate is used.
pub fn calibrate(
    reported_kwh: f64,
    runtime_minutes: u32,
    fallback_power_watts: f64,
    tolerance: f64,
) -> EnergyCalibration {
    let derived_kwh = if runtime_minutes == 0 {
        0.0
    } else {
        f64::from(runtime_minutes) / 60.0 * fallback_power_watts / 1000.0
    };

    let use_scale = derived_kwh > 0.0
        && reported_kwh.is_finite()
        && reported_kwh >= 0.0
        && ((reported_kwh / derived_kwh - LN_10).abs() / LN_10) <= tolerance;

    EnergyCalibration {
        use_scale,
        scale_factor: if use_scale {
            LN_10
        } else {
            fallback_power_watts / 1000.0
        },
        fallback_power_watts,
        reported_kwh,
        derived_kwh,
        energy_kwh: if use_scale { reported_kwh } else { derived_kwh },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_heater_types::EnergySource;

    #[test]
    fn test_device_value_within_tolerance_is_trusted() {
        let calibration = calibrate(2.302_585, 60, 1000.0, 0.2);

        assert!((calibration.derived_kwh - 1.0).abs() < 1e-12);
        assert!(calibration.use_scale);
        assert!((calibration.energy_kwh - 2.302_585).abs() < 1e-12);
        assert!((calibration.scale_factor - LN_10).abs() < 1e-12);
        assert_eq!(calibration.source(), EnergySource::DeviceReported);
    }

    #[test]
    fn test_zero_runtime_yields_zero_energy() {
        let calibration = calibrate(5.0, 0, 3000.0, 0.2);

        assert!(calibration.derived_kwh.abs() < f64::EPSILON);
        assert!(!calibration.use_scale);
        assert!(calibration.energy_kwh.abs() < f64::EPSILON);
        assert_eq!(calibration.source(), EnergySource::RuntimeDerived);
    }

    #[test]
    fn test_out_of_tolerance_falls_back_to_runtime() {
        // ratio 1.0 is far from ln(10)
        let calibration = calibrate(3.0, 60, 3000.0, 0.2);

        assert!(!calibration.use_scale);
        assert!((calibration.energy_kwh - 3.0).abs() < 1e-12);
        assert!((calibration.scale_factor - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tolerance_boundary() {
        // 20 % above ln(10) is accepted, 25 % is not
        let derived = 1.5;
        let inside = calibrate(derived * LN_10 * 1.19, 30, 3000.0, 0.2);
        let outside = calibrate(derived * LN_10 * 1.25, 30, 3000.0, 0.2);

        assert!(inside.use_scale);
        assert!(!outside.use_scale);
    }

    #[test]
    fn test_zero_power_never_uses_scale() {
        let calibration = calibrate(2.0, 120, 0.0, 0.2);
        assert!(!calibration.use_scale);
        assert!(calibration.energy_kwh.abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_or_negative_reports_use_runtime() {
        for reported in [f64::NAN, f64::INFINITY, -2.3] {
            let calibration = calibrate(reported, 60, 1000.0, 0.2);
            assert!(!calibration.use_scale);
            assert!((calibration.energy_kwh - 1.0).abs() < 1e-12);
        }
    }
}
