//! Conversion of regularized series into display rows.

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::{CentralId, ProcessedRow, RegularizedSeries, SeriesPoint};
use crate::services::clamp::{format_temperature, ClampBounds};

/// Default `chrono` format for the localized timestamp column.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Builds [`ProcessedRow`]s from a device's series.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    tz: FixedOffset,
    clamp: ClampBounds,
    timestamp_format: String,
}

impl RowBuilder {
    pub fn new(tz: FixedOffset, clamp: ClampBounds, timestamp_format: impl Into<String>) -> Self {
        Self {
            tz,
            clamp,
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn localize(&self, slot: DateTime<Utc>) -> String {
        slot.with_timezone(&self.tz)
            .format(&self.timestamp_format)
            .to_string()
    }

    /// One row per point. Values pass through the clamp; missing points
    /// render as `-`.
    pub fn build(
        &self,
        central: &CentralId,
        device_label: &str,
        series: &RegularizedSeries,
    ) -> Vec<ProcessedRow> {
        series
            .points
            .iter()
            .map(|point| self.row(central, device_label, point))
            .collect()
    }

    fn row(&self, central: &CentralId, device_label: &str, point: &SeriesPoint) -> ProcessedRow {
        let clamped = point.value.map(|raw| self.clamp.clamp(raw));
        let value = clamped.and_then(|c| c.value);
        let was_clamped = clamped.is_some_and(|c| c.was_clamped);

        ProcessedRow {
            central_id: central.clone(),
            device_label: device_label.to_string(),
            localized_timestamp: self.localize(point.slot),
            sort_key: point.slot.timestamp_millis(),
            temperature: format_temperature(value),
            interpolated: point.interpolated,
            value_was_clamped: was_clamped,
            missing: point.missing || value.is_none(),
            missing_reason: point.reason.map(|r| r.as_str().to_string()),
            gap_size: point.gap_size,
        }
    }
}

/// Order rows by device label, then by slot.
pub fn sort_rows(rows: &mut [ProcessedRow]) {
    rows.sort_by(|a, b| {
        a.device_label
            .cmp(&b.device_label)
            .then(a.sort_key.cmp(&b.sort_key))
    });
}
