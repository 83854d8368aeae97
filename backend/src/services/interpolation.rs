//! Value synthesis for short gaps.
//!
//! A filled slot is a weighted blend of the mean of nearby real readings and a
//! time-of-day baseline. The baseline carries a small per-slot jitter derived
//! from a SHA-256 digest of the device and slot, so fills are reproducible
//! (identical queries give identical reports) without repeating the same value
//! across every gap.

use chrono::{DateTime, FixedOffset, Utc};
use sha2::{Digest, Sha256};

use crate::models::time::local_minute_of_day;

/// Real slots considered on each side of a filled slot.
pub const NEIGHBOR_RADIUS: usize = 4;

/// Blend weights between the neighbor mean and the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationWeights {
    pub neighbor: f64,
    pub baseline: f64,
}

impl Default for InterpolationWeights {
    fn default() -> Self {
        Self {
            neighbor: 0.7,
            baseline: 0.3,
        }
    }
}

impl InterpolationWeights {
    /// Weights with `neighbor` share, baseline taking the remainder.
    pub fn with_neighbor_share(neighbor: f64) -> Self {
        let neighbor = neighbor.clamp(0.0, 1.0);
        Self {
            neighbor,
            baseline: 1.0 - neighbor,
        }
    }
}

/// Coarse time-of-day band used for the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBand {
    /// 00:00 to 06:00
    EarlyMorning,
    /// 06:00 to 18:00
    Daytime,
    /// 18:00 to 24:00
    Evening,
}

impl DayBand {
    pub fn for_minute(minute_of_day: u32) -> Self {
        match minute_of_day {
            m if m < 6 * 60 => DayBand::EarlyMorning,
            m if m < 18 * 60 => DayBand::Daytime,
            _ => DayBand::Evening,
        }
    }

    pub fn for_slot(slot: DateTime<Utc>, tz: &FixedOffset) -> Self {
        Self::for_minute(local_minute_of_day(slot, tz))
    }

    /// Typical temperature for the band, in °C.
    pub fn baseline(self) -> f64 {
        match self {
            DayBand::EarlyMorning => 19.5,
            DayBand::Daytime => 21.5,
            DayBand::Evening => 20.5,
        }
    }

    /// Half-width of the jitter applied on top of the baseline.
    pub fn jitter_span(self) -> f64 {
        match self {
            DayBand::EarlyMorning => 0.3,
            DayBand::Daytime => 0.4,
            DayBand::Evening => 0.3,
        }
    }
}

/// Deterministic value in `[-span, span)` for a device and slot.
pub fn slot_jitter(device: &str, slot: DateTime<Utc>, span: f64) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(device.as_bytes());
    hasher.update(slot.timestamp_millis().to_be_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let unit = (u64::from_be_bytes(head) >> 11) as f64 / (1u64 << 53) as f64;
    (unit * 2.0 - 1.0) * span
}

/// Mean of finite real values within `NEIGHBOR_RADIUS` slots of `index`.
///
/// `timeline[i]` is `Some` when slot `i` holds a real reading.
pub fn neighbor_mean(timeline: &[Option<f64>], index: usize) -> Option<f64> {
    let lo = index.saturating_sub(NEIGHBOR_RADIUS);
    let hi = (index + NEIGHBOR_RADIUS).min(timeline.len().saturating_sub(1));

    let (sum, count) = (lo..=hi)
        .filter(|&i| i != index)
        .filter_map(|i| timeline.get(i).copied().flatten())
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Synthesize a value for an empty slot.
///
/// Without neighbors the jittered baseline is used alone.
pub fn synthesize(
    device: &str,
    slot: DateTime<Utc>,
    neighbors: Option<f64>,
    weights: &InterpolationWeights,
    tz: &FixedOffset,
) -> f64 {
    let band = DayBand::for_slot(slot, tz);
    let baseline = band.baseline() + slot_jitter(device, slot, band.jitter_span());
    match neighbors {
        Some(mean) => weights.neighbor * mean + weights.baseline * baseline,
        None => baseline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_bands() {
        assert_eq!(DayBand::for_minute(0), DayBand::EarlyMorning);
        assert_eq!(DayBand::for_minute(5 * 60 + 30), DayBand::EarlyMorning);
        assert_eq!(DayBand::for_minute(6 * 60), DayBand::Daytime);
        assert_eq!(DayBand::for_minute(17 * 60 + 30), DayBand::Daytime);
        assert_eq!(DayBand::for_minute(18 * 60), DayBand::Evening);
        assert_eq!(DayBand::for_minute(23 * 60 + 30), DayBand::Evening);
    }

    #[test]
    fn test_jitter_is_deterministic_and_bounded() {
        let slot = Utc.with_ymd_and_hms(2025, 1, 1, 11, 30, 0).unwrap();
        let a = slot_jitter("T-01", slot, 0.4);
        let b = slot_jitter("T-01", slot, 0.4);
        assert_eq!(a, b);
        assert!((-0.4..0.4).contains(&a));
    }

    #[test]
    fn test_jitter_varies_across_slots() {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..8)
            .map(|i| slot_jitter("T-01", base + chrono::TimeDelta::minutes(30 * i), 0.3))
            .collect();
        let first = values[0];
        assert!(values.iter().any(|v| (v - first).abs() > 1e-9));
    }

    #[test]
    fn test_neighbor_mean_uses_window_only() {
        let timeline = vec![
            Some(10.0), // outside the window of index 5
            Some(20.0),
            None,
            None,
            None,
            None,
            Some(22.0),
            None,
            None,
            None,
            Some(30.0), // outside the window of index 5
        ];
        assert_eq!(neighbor_mean(&timeline, 5), Some(21.0));
    }

    #[test]
    fn test_neighbor_mean_skips_non_finite() {
        let timeline = vec![Some(f64::NAN), None, Some(20.0)];
        assert_eq!(neighbor_mean(&timeline, 1), Some(20.0));
        assert_eq!(neighbor_mean(&[None, None, None], 1), None);
    }

    #[test]
    fn test_synthesize_blends_toward_neighbors() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let slot = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let weights = InterpolationWeights::default();
        let value = synthesize("T-01", slot, Some(20.5), &weights, &tz);
        // 0.7 * 20.5 + 0.3 * (21.5 ± 0.4)
        assert!(value > 0.7 * 20.5 + 0.3 * 21.1 - 1e-9);
        assert!(value < 0.7 * 20.5 + 0.3 * 21.9 + 1e-9);
    }

    #[test]
    fn test_synthesize_without_neighbors_uses_baseline() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let slot = Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap();
        let value = synthesize("T-01", slot, None, &InterpolationWeights::default(), &tz);
        assert!((value - 19.5).abs() <= 0.3);
    }

    #[test]
    fn test_neighbor_share_is_clamped() {
        let weights = InterpolationWeights::with_neighbor_share(1.5);
        assert_eq!(weights.neighbor, 1.0);
        assert_eq!(weights.baseline, 0.0);
    }
}
