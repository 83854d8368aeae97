//! Temperature report HTTP server binary.
//!
//! Loads the report configuration, wires the gateway transport into the
//! report service, and serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! REPORT_CONFIG=backend/report.toml cargo run --bin report-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `REPORT_CONFIG`: Path to the TOML configuration file
//! - `REPORT_GATEWAY_URL`: Override for the gateway URL template
//! - `REPORT_RPC_TIMEOUT_SECS`: Override for the per-request timeout
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use temp_report::http::{create_router, AppState};
use temp_report::rpc::HttpTransport;
use temp_report::{ReportConfig, ReportContext, ReportService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting temperature report server");

    let mut config = match ReportConfig::from_default_location() {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            ReportConfig::default()
        }
    };
    config.apply_env_overrides()?;
    config.validate()?;
    info!(
        "Loaded {} device(s), gateway {}",
        config.devices.len(),
        config.gateway.url_template
    );

    let transport = HttpTransport::new(config.gateway.url_template.clone())?;
    let context = ReportContext::with_cache_ttl(config.cache_ttl());
    let service = ReportService::from_config(&config, Arc::new(transport), context)?;

    let app = create_router(AppState::new(service));

    // Determine bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
