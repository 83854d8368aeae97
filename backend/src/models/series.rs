//! Regularizer output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::devices::DeviceId;

/// A maximal run of consecutive canonical slots without a real reading.
///
/// Indices address the device's slot timeline, which starts at its first real
/// slot in the query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub start_index: usize,
    pub end_index: usize,
    pub start_slot: DateTime<Utc>,
    pub end_slot: DateTime<Utc>,
    pub size: usize,
}

impl Gap {
    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }
}

/// Why a slot could not be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// The containing gap is longer than the configured maximum.
    GapTooLarge,
    /// The containing gap starts and ends on different local days.
    CrossesMidnight,
}

impl MissingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingReason::GapTooLarge => "gap_too_large",
            MissingReason::CrossesMidnight => "crosses_midnight",
        }
    }
}

impl std::fmt::Display for MissingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One position of a regularized series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub slot: DateTime<Utc>,
    pub value: Option<f64>,
    pub interpolated: bool,
    #[serde(default)]
    pub missing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<MissingReason>,
}

impl SeriesPoint {
    pub fn real(slot: DateTime<Utc>, value: f64) -> Self {
        Self {
            slot,
            value: Some(value),
            interpolated: false,
            missing: false,
            gap_size: None,
            reason: None,
        }
    }

    pub fn interpolated(slot: DateTime<Utc>, value: f64, gap_size: usize) -> Self {
        Self {
            slot,
            value: Some(value),
            interpolated: true,
            missing: false,
            gap_size: Some(gap_size),
            reason: None,
        }
    }

    pub fn missing(slot: DateTime<Utc>, gap_size: usize, reason: MissingReason) -> Self {
        Self {
            slot,
            value: None,
            interpolated: false,
            missing: true,
            gap_size: Some(gap_size),
            reason: Some(reason),
        }
    }
}

/// Everything the regularizer learned about one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegularizedSeries {
    pub device: Option<DeviceId>,
    /// Real, interpolated and (optionally) missing points in slot order.
    pub points: Vec<SeriesPoint>,
    /// Gaps detected between the device's first and last real slot.
    pub gaps: Vec<Gap>,
    /// Slots on days with data that could not be filled.
    pub missing_slots: Vec<DateTime<Utc>>,
}

impl RegularizedSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn real_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| !p.interpolated && !p.missing)
            .count()
    }

    pub fn interpolated_count(&self) -> usize {
        self.points.iter().filter(|p| p.interpolated).count()
    }
}
