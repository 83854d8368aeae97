//! Data Transfer Objects for the HTTP API.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::time::to_iso_millis;
use crate::models::{CentralFailure, DeviceInfo, ProcessedRow, ReportOutput};

/// Request body for a temperature report.
///
/// Dates are local calendar days; the report covers `startDate` 00:00 through
/// `endDate` 23:59:59.999.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Finished report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub rows: Vec<ProcessedRow>,
    pub failures: Vec<CentralFailure>,
    /// Device id -> ISO instants of slots that could not be filled
    pub missing_slots: BTreeMap<String, Vec<String>>,
    /// Whether the rows were served from the cache
    pub cached: bool,
}

impl From<ReportOutput> for ReportResponse {
    fn from(output: ReportOutput) -> Self {
        let cached = output.is_cached();
        let missing_slots = output
            .missing_slots
            .into_iter()
            .map(|(device, slots)| {
                (
                    device.to_string(),
                    slots.into_iter().map(to_iso_millis).collect(),
                )
            })
            .collect();
        Self {
            rows: output.rows,
            failures: output.failures,
            missing_slots,
            cached,
        }
    }
}

/// Configured devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceInfo>,
    pub total: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of configured devices
    pub devices: usize,
}
