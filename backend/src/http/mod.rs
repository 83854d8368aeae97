//! HTTP server module for the report backend.
//!
//! Exposes [`ReportService`](crate::services::ReportService) as a small REST
//! API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Request parsing and local-date conversion              │
//! │  - JSON serialization, CORS, compression, error mapping   │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services::orchestrator)                   │
//! │  - Validation, cache, concurrency guard                   │
//! │  - Chunked aggregation and regularization                 │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Transport Layer (rpc/)                                   │
//! │  - HttpTransport to central gateways                      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
