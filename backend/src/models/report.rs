//! Pipeline output types consumed by external renderers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::devices::{CentralId, DeviceId};

/// A bounded sub-window of the query, `[start, end]` at millisecond resolution.
///
/// `start` is local midnight of the chunk's first day (or the query start) and
/// `end` is 23:59:59.999 local of its last day (or the query end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateChunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateChunk {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Structured record of one central that could not be queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralFailure {
    pub central_id: CentralId,
    /// HTTP status, or `0` for timeouts and transport errors.
    pub status: u16,
    pub status_text: String,
    pub url: String,
}

/// One row of the finished report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRow {
    pub central_id: CentralId,
    pub device_label: String,
    pub localized_timestamp: String,
    /// Slot instant as epoch milliseconds.
    pub sort_key: i64,
    /// Two-decimal temperature, or `-` when there is no value.
    pub temperature: String,
    pub interpolated: bool,
    pub value_was_clamped: bool,
    pub missing: bool,
    pub missing_reason: Option<String>,
    pub gap_size: Option<usize>,
}

/// Where a report's rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Fresh,
    Cached,
}

/// Device -> slots that could not be filled.
pub type MissingSlotMap = BTreeMap<DeviceId, BTreeSet<DateTime<Utc>>>;

/// Result of one report query.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    /// Rows ordered by `(device_label, sort_key)`.
    pub rows: Vec<ProcessedRow>,
    /// Per-central failures collected across all chunks.
    pub failures: Vec<CentralFailure>,
    pub missing_slots: MissingSlotMap,
    pub source: ResultSource,
}

impl ReportOutput {
    pub fn is_cached(&self) -> bool {
        self.source == ResultSource::Cached
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
