//! Per-chunk aggregation of central responses.
//!
//! One request per central, each bounded by its own timeout. A failing
//! central contributes an empty reading list plus a [`CentralFailure`] and
//! never stops the others.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::envelope::normalize_response;
use super::transport::{CentralRequest, CentralTransport};
use crate::models::{CentralFailure, CentralId, DateChunk, DeviceId, RawReading};

/// Per-request timeout: 120 seconds.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(120);

/// How centrals within one chunk are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// One central at a time, in central order.
    #[default]
    Sequential,
    /// All centrals at once, joined before merging.
    Concurrent,
}

/// Devices to request from one central.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralBatch {
    pub central: CentralId,
    pub devices: Vec<DeviceId>,
}

impl CentralBatch {
    pub fn new(central: CentralId, devices: Vec<DeviceId>) -> Self {
        Self { central, devices }
    }
}

/// Everything learned from one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFetch {
    /// Readings per central; failed and skipped centrals map to empty lists.
    pub readings: BTreeMap<CentralId, Vec<RawReading>>,
    pub failures: Vec<CentralFailure>,
}

impl ChunkFetch {
    pub fn reading_count(&self) -> usize {
        self.readings.values().map(Vec::len).sum()
    }
}

/// Issues chunk requests through a [`CentralTransport`].
#[derive(Clone)]
pub struct RpcAggregationClient {
    transport: Arc<dyn CentralTransport>,
    timeout: Duration,
    mode: FetchMode,
}

impl RpcAggregationClient {
    pub fn new(transport: Arc<dyn CentralTransport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_RPC_TIMEOUT,
            mode: FetchMode::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Fetch one chunk for every batch.
    pub async fn fetch_chunk(&self, chunk: &DateChunk, batches: &[CentralBatch]) -> ChunkFetch {
        let mut fetch = ChunkFetch::default();
        let mut active = Vec::new();
        for batch in batches {
            if batch.devices.is_empty() {
                debug!("Skipping central {} with no devices", batch.central);
                fetch.readings.insert(batch.central.clone(), Vec::new());
            } else {
                active.push(batch);
            }
        }

        let outcomes = match self.mode {
            FetchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(active.len());
                for batch in &active {
                    outcomes.push(self.fetch_central(chunk, batch).await);
                }
                outcomes
            }
            FetchMode::Concurrent => {
                join_all(active.iter().map(|batch| self.fetch_central(chunk, batch))).await
            }
        };

        for (batch, outcome) in active.into_iter().zip(outcomes) {
            let readings = match outcome {
                Ok(readings) => readings,
                Err(failure) => {
                    fetch.failures.push(failure);
                    Vec::new()
                }
            };
            fetch
                .readings
                .entry(batch.central.clone())
                .or_default()
                .extend(readings);
        }

        debug!(
            "Chunk {} .. {}: {} reading(s), {} failure(s)",
            chunk.start,
            chunk.end,
            fetch.reading_count(),
            fetch.failures.len()
        );
        fetch
    }

    async fn fetch_central(
        &self,
        chunk: &DateChunk,
        batch: &CentralBatch,
    ) -> Result<Vec<RawReading>, CentralFailure> {
        let url = self.transport.endpoint(&batch.central);
        let failure = |status: u16, status_text: String| {
            warn!(
                "Central {} failed ({} {}) at {}",
                batch.central, status, status_text, url
            );
            CentralFailure {
                central_id: batch.central.clone(),
                status,
                status_text,
                url: url.clone(),
            }
        };

        let request = CentralRequest::for_chunk(batch.devices.clone(), chunk);
        let body = match tokio::time::timeout(
            self.timeout,
            self.transport.call(&batch.central, &request),
        )
        .await
        {
            Err(_) => return Err(failure(0, "timeout".to_string())),
            Ok(Err(err)) => return Err(failure(err.status, err.status_text)),
            Ok(Ok(body)) => body,
        };

        normalize_response(body).map_err(|err| failure(0, err.to_string()))
    }
}
