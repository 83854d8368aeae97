//! Network seam for central gateways.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::time::to_iso_millis;
use crate::models::{CentralId, DateChunk, DeviceId};

/// Gateway endpoint with a `{central}` placeholder.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://{central}.gateway.local/api/rpc/temperature_report";

/// Body of one report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralRequest {
    pub devices: Vec<DeviceId>,
    /// ISO-8601 instant, millisecond precision.
    pub date_start: String,
    pub date_end: String,
}

impl CentralRequest {
    pub fn for_chunk(devices: Vec<DeviceId>, chunk: &DateChunk) -> Self {
        Self {
            devices,
            date_start: to_iso_millis(chunk.start),
            date_end: to_iso_millis(chunk.end),
        }
    }
}

/// A call that did not produce a usable response.
///
/// `status` is the HTTP status, or `0` when no response arrived.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {status_text}")]
pub struct TransportError {
    pub status: u16,
    pub status_text: String,
}

impl TransportError {
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }

    /// Failure without an HTTP response.
    pub fn network(status_text: impl Into<String>) -> Self {
        Self::new(0, status_text)
    }
}

/// Something that can deliver a [`CentralRequest`] to a central.
///
/// Implementations must be `Send + Sync`; the client applies the timeout.
#[async_trait]
pub trait CentralTransport: Send + Sync {
    /// URL reported in failure records.
    fn endpoint(&self, central: &CentralId) -> String;

    /// Send the request and return the decoded JSON body.
    async fn call(
        &self,
        central: &CentralId,
        request: &CentralRequest,
    ) -> Result<serde_json::Value, TransportError>;
}

/// JSON-over-HTTPS transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url_template: String,
}

impl HttpTransport {
    pub fn new(url_template: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, url_template))
    }

    pub fn with_client(client: reqwest::Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }
}

#[async_trait]
impl CentralTransport for HttpTransport {
    fn endpoint(&self, central: &CentralId) -> String {
        self.url_template.replace("{central}", central.as_str())
    }

    async fn call(
        &self,
        central: &CentralId,
        request: &CentralRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let url = self.endpoint(central);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            return Err(TransportError::new(status.as_u16(), text));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::new(status.as_u16(), format!("invalid JSON body: {}", e)))
    }
}
