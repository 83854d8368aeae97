//! Normalization of central responses into [`RawReading`]s.
//!
//! Gateways answer either with a bare array of readings or with an object
//! wrapping that array. Individual entries are parsed leniently: field names
//! vary between firmware versions, values may arrive as strings, and a `null`
//! value is kept as a non-finite reading so the row renders as missing.
//! Entries whose timestamp cannot be parsed are dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::RawReading;

/// The response did not have a recognised shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised response envelope: {0}")]
pub struct EnvelopeError(pub String);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(alias = "readings", alias = "result")]
        data: Vec<Value>,
    },
}

#[derive(Debug, Deserialize)]
struct WireReading {
    #[serde(
        rename = "deviceKey",
        alias = "device",
        alias = "deviceName",
        alias = "device_key"
    )]
    device_key: String,
    #[serde(alias = "ts", alias = "time")]
    timestamp: WireTimestamp,
    #[serde(default, alias = "temperature", alias = "temp")]
    value: Option<WireValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Number(f64),
    Text(String),
}

impl WireTimestamp {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            WireTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            WireTimestamp::FractionalMillis(ms) if ms.is_finite() => {
                DateTime::from_timestamp_millis(ms.round() as i64)
            }
            WireTimestamp::FractionalMillis(_) => None,
            WireTimestamp::Text(text) => parse_timestamp(text),
        }
    }
}

impl WireValue {
    fn to_f64(&self) -> f64 {
        match self {
            WireValue::Number(v) => *v,
            WireValue::Text(text) => text.trim().replace(',', ".").parse().unwrap_or(f64::NAN),
        }
    }
}

/// Parse RFC 3339, or a naive ISO date-time taken as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object without a readings array",
    }
}

/// Flatten a response body into readings.
pub fn normalize_response(body: Value) -> Result<Vec<RawReading>, EnvelopeError> {
    let shape = shape_of(&body);
    let entries = match serde_json::from_value::<Envelope>(body) {
        Ok(Envelope::Bare(entries)) | Ok(Envelope::Wrapped { data: entries }) => entries,
        Err(_) => return Err(EnvelopeError(shape.to_string())),
    };

    let total = entries.len();
    let readings: Vec<RawReading> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<WireReading>(entry).ok())
        .filter_map(|wire| {
            let timestamp = wire.timestamp.to_utc()?;
            let value = wire.value.as_ref().map_or(f64::NAN, WireValue::to_f64);
            Some(RawReading::new(wire.device_key, timestamp, value))
        })
        .collect();

    if readings.len() < total {
        log::debug!("Dropped {} malformed reading(s) of {}", total - readings.len(), total);
    }
    Ok(readings)
}
