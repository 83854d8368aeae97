//! Outbound calls to central gateways.
//!
//! - [`transport`]: the network seam and its `reqwest` implementation
//! - [`envelope`]: response-shape normalization
//! - [`client`]: per-chunk fan-out with failure isolation

pub mod client;
pub mod envelope;
pub mod transport;

pub use client::{CentralBatch, ChunkFetch, FetchMode, RpcAggregationClient, DEFAULT_RPC_TIMEOUT};
pub use envelope::{normalize_response, EnvelopeError};
pub use transport::{CentralRequest, CentralTransport, HttpTransport, TransportError, DEFAULT_URL_TEMPLATE};
