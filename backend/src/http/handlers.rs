//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! report service.

use axum::{extract::State, Json};

use super::dto::{DeviceListResponse, HealthResponse, ReportRequest, ReportResponse};
use super::error::AppError;
use super::state::AppState;
use crate::models::DeviceId;
use crate::services::ReportQuery;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        devices: state.service.directory().len(),
    }))
}

/// GET /v1/devices
pub async fn list_devices(State(state): State<AppState>) -> HandlerResult<DeviceListResponse> {
    let devices: Vec<_> = state.service.directory().iter().cloned().collect();
    let total = devices.len();
    Ok(Json(DeviceListResponse { devices, total }))
}

/// POST /v1/temperature-report
///
/// Runs (or serves from cache) a report for the selected devices and local
/// date range. Guard rejections answer `409 Conflict`.
pub async fn temperature_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> HandlerResult<ReportResponse> {
    let devices: Vec<DeviceId> = request.devices.into_iter().map(DeviceId::from).collect();
    let query = match (request.start_date, request.end_date) {
        (Some(start), Some(end)) => {
            ReportQuery::for_local_dates(devices, start, end, &state.service.options().tz)
        }
        _ => ReportQuery {
            devices,
            start: None,
            end: None,
        },
    };

    let output = state.service.run(&query).await?;
    Ok(Json(output.into()))
}
