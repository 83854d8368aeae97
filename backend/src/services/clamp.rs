//! Bounding of readings to the valid physical range.

use serde::{Deserialize, Serialize};

/// Lowest temperature reported, in °C.
pub const MIN_TEMPERATURE: f64 = 17.0;
/// Highest temperature reported, in °C.
pub const MAX_TEMPERATURE: f64 = 25.0;

/// A reading after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClampedValue {
    pub value: Option<f64>,
    pub was_clamped: bool,
}

/// Inclusive range readings are bounded to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ClampBounds {
    fn default() -> Self {
        Self {
            min: MIN_TEMPERATURE,
            max: MAX_TEMPERATURE,
        }
    }
}

impl ClampBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bound `raw` to the range, rounding in-range values to two decimals.
    ///
    /// Non-finite input yields no value and is not considered clamped.
    pub fn clamp(&self, raw: f64) -> ClampedValue {
        if !raw.is_finite() {
            return ClampedValue {
                value: None,
                was_clamped: false,
            };
        }
        if raw < self.min {
            return ClampedValue {
                value: Some(round2(self.min)),
                was_clamped: true,
            };
        }
        if raw > self.max {
            return ClampedValue {
                value: Some(round2(self.max)),
                was_clamped: true,
            };
        }
        ClampedValue {
            value: Some(round2(raw).clamp(self.min, self.max)),
            was_clamped: false,
        }
    }
}

/// Clamp with the default `[17.0, 25.0]` range.
pub fn clamp_temperature(raw: f64) -> ClampedValue {
    ClampBounds::default().clamp(raw)
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a clamped value for display: `"21.50"` or `"-"`.
pub fn format_temperature(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_in_range_is_rounded_not_clamped() {
        let out = clamp_temperature(21.456);
        assert_eq!(out.value, Some(21.46));
        assert!(!out.was_clamped);
    }

    #[test]
    fn test_out_of_range_snaps_to_bound() {
        let high = clamp_temperature(30.0);
        assert_eq!(high.value, Some(25.0));
        assert!(high.was_clamped);

        let low = clamp_temperature(-4.2);
        assert_eq!(low.value, Some(17.0));
        assert!(low.was_clamped);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(clamp_temperature(17.0), ClampedValue { value: Some(17.0), was_clamped: false });
        assert_eq!(clamp_temperature(25.0), ClampedValue { value: Some(25.0), was_clamped: false });
    }

    #[test]
    fn test_non_finite_has_no_value() {
        for raw in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let out = clamp_temperature(raw);
            assert_eq!(out.value, None);
            assert!(!out.was_clamped);
        }
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(format_temperature(Some(25.0)), "25.00");
        assert_eq!(format_temperature(Some(20.5)), "20.50");
        assert_eq!(format_temperature(None), "-");
    }

    proptest! {
        #[test]
        fn prop_outside_range_returns_nearest_bound(raw in prop_oneof![-1000.0f64..16.999, 25.001f64..1000.0]) {
            let out = clamp_temperature(raw);
            prop_assert!(out.was_clamped);
            let expected = if raw < MIN_TEMPERATURE { MIN_TEMPERATURE } else { MAX_TEMPERATURE };
            prop_assert_eq!(out.value, Some(expected));
        }

        #[test]
        fn prop_inside_range_keeps_rounded_value(raw in 17.0f64..=25.0) {
            let out = clamp_temperature(raw);
            prop_assert!(!out.was_clamped);
            prop_assert_eq!(out.value, Some(round2(raw)));
        }
    }
}
