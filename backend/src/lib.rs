//! # Temperature Report Backend
//!
//! Builds regular, half-hourly temperature reports from readings scattered
//! across several central gateways.
//!
//! ## Pipeline
//!
//! - **Chunking**: long date ranges are split into local-calendar chunks
//! - **Aggregation**: one RPC per central and chunk, with per-central failure isolation
//! - **Normalization**: legacy gateways' shifted timestamps are corrected
//! - **Regularization**: readings snap to 30-minute slots; short same-day gaps are filled
//! - **Clamping**: values are bounded to the valid physical range
//! - **Caching**: finished reports are memoized with a TTL behind a single-flight guard
//!
//! ## Architecture
//!
//! - [`models`]: identifiers, readings, series and report types
//! - [`rpc`]: the central transport seam and response normalization
//! - [`services`]: pipeline stages and the [`services::ReportService`] orchestrator
//! - [`config`]: TOML configuration with environment overrides
//! - [`http`]: Axum-based HTTP API (feature `http-server`)

pub mod config;
pub mod error;
pub mod models;
pub mod rpc;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::ReportConfig;
pub use error::{ReportError, ReportResult};
pub use services::{ReportContext, ReportQuery, ReportService};
