//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/devices", get(handlers::list_devices))
        .route("/temperature-report", post(handlers::temperature_report));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CentralId, DeviceDirectory, DeviceInfo};
    use crate::rpc::{CentralRequest, CentralTransport, RpcAggregationClient, TransportError};
    use crate::services::{LegacyNormalizer, PipelineOptions, ReportContext, ReportService};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct OneReading;

    #[async_trait]
    impl CentralTransport for OneReading {
        fn endpoint(&self, central: &CentralId) -> String {
            format!("mock://{}", central)
        }

        async fn call(
            &self,
            _central: &CentralId,
            _request: &CentralRequest,
        ) -> Result<Value, TransportError> {
            Ok(json!([
                { "deviceKey": "T-01", "timestamp": "2025-01-01T11:00:00Z", "value": 30.0 }
            ]))
        }
    }

    fn app() -> Router {
        let service = ReportService::new(
            DeviceDirectory::new(vec![DeviceInfo::new("T-01", "Freezer A", "acme")]),
            RpcAggregationClient::new(Arc::new(OneReading)),
            LegacyNormalizer::default(),
            PipelineOptions::default(),
            ReportContext::new(),
        );
        create_router(AppState::new(service))
    }

    async fn post_report(app: Router, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/v1/temperature-report")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_report_round_trip_and_cache() {
        let app = app();
        let body = json!({ "devices": ["T-01"], "startDate": "2025-01-01", "endDate": "2025-01-01" });

        let (status, first) = post_report(app.clone(), body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["cached"], json!(false));
        assert_eq!(first["rows"][0]["temperature"], json!("25.00"));
        assert_eq!(first["rows"][0]["valueWasClamped"], json!(true));
        assert_eq!(first["rows"][0]["localizedTimestamp"], json!("01/01/2025 08:00"));

        let (status, second) = post_report(app, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["cached"], json!(true));
        assert_eq!(second["rows"], first["rows"]);
    }

    #[tokio::test]
    async fn test_invalid_query_is_400() {
        let (status, body) = post_report(app(), json!({ "devices": [], "startDate": "2025-01-01" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_QUERY"));
    }
}
