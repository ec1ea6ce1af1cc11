use serde::{Deserialize, Serialize};

pub const MIN_SENSITIVITY: u8 = 1;
pub const MAX_SENSITIVITY: u8 = 10;
pub const DEFAULT_SENSITIVITY: u8 = 5;

/// Detection thresholds derived from the 1-10 sensitivity dial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityParams {
    pub sensitivity: u8,
    pub min_duration: f64,
    pub min_energy: f64,
    pub min_zcr: f64,
    pub min_spectral_flux: f64,
}

/// Higher sensitivity means lower thresholds and more detections.
/// Out-of-range input is clamped to 1..=10.
pub fn map_sensitivity(sensitivity: u8) -> SensitivityParams {
    let sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
    let s = f64::from(sensitivity);

    SensitivityParams {
        sensitivity,
        min_duration: (4.0 - 0.3 * s).max(1.0),
        min_energy: (0.3 - 0.025 * s).max(0.0),
        min_zcr: (0.15 - 0.013 * s).max(0.0),
        min_spectral_flux: (0.08 - 0.007 * s).max(0.0),
    }
}

impl Default for SensitivityParams {
    fn default() -> Self {
        map_sensitivity(DEFAULT_SENSITIVITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_most_permissive_at_ten() {
        let p = map_sensitivity(10);
        assert!(approx(p.min_energy, 0.05));
        assert!(approx(p.min_zcr, 0.02));
        assert!(approx(p.min_spectral_flux, 0.01));
        assert!(approx(p.min_duration, 1.0));
    }

    #[test]
    fn test_least_permissive_at_one() {
        let p = map_sensitivity(1);
        assert!(approx(p.min_energy, 0.275));
        assert!(approx(p.min_zcr, 0.137));
        assert!(approx(p.min_spectral_flux, 0.073));
        assert!(approx(p.min_duration, 3.7));
    }

    #[test]
    fn test_thresholds_decrease_monotonically() {
        for s in MIN_SENSITIVITY..MAX_SENSITIVITY {
            let lo = map_sensitivity(s);
            let hi = map_sensitivity(s + 1);
            assert!(hi.min_energy < lo.min_energy);
            assert!(hi.min_zcr < lo.min_zcr);
            assert!(hi.min_spectral_flux < lo.min_spectral_flux);
            assert!(hi.min_duration <= lo.min_duration);
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(map_sensitivity(0), map_sensitivity(1));
        assert_eq!(map_sensitivity(42), map_sensitivity(10));
        assert_eq!(map_sensitivity(0).sensitivity, 1);
    }
}
