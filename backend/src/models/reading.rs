use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One telemetry sample as returned by a central.
///
/// `device_key` is whatever the central used to name the device; it may be a
/// display label rather than the configured identifier and is resolved through
/// [`DeviceDirectory::resolve`](super::devices::DeviceDirectory::resolve).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    pub device_key: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl RawReading {
    pub fn new(device_key: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            device_key: device_key.into(),
            timestamp,
            value,
        }
    }
}
