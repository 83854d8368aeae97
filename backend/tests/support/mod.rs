#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::{json, Value};

use temp_report::models::time::{offset_from_minutes, to_iso_millis};
use temp_report::models::{CentralId, DeviceDirectory, DeviceInfo};
use temp_report::rpc::{CentralRequest, CentralTransport, RpcAggregationClient, TransportError};
use temp_report::services::{LegacyNormalizer, PipelineOptions, ReportContext, ReportService};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// =============================================================================
// Time helpers
// =============================================================================

/// Report calendar used by the fixtures: UTC-3.
pub fn tz() -> FixedOffset {
    offset_from_minutes(-180).unwrap()
}

/// Instant at local wall-clock time.
pub fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    tz().with_ymd_and_hms(y, mo, d, h, mi, 0)
        .unwrap()
        .with_timezone(&Utc)
}

// =============================================================================
// Mock transport
// =============================================================================

/// A reading as a central would report it.
#[derive(Debug, Clone)]
pub struct WireFixture {
    pub device_key: String,
    pub timestamp: DateTime<Utc>,
    pub value: Value,
}

pub fn wire(device_key: &str, timestamp: DateTime<Utc>, value: f64) -> WireFixture {
    WireFixture {
        device_key: device_key.to_string(),
        timestamp,
        value: json!(value),
    }
}

/// In-memory central gateways.
///
/// Each central answers with every fixture whose timestamp falls inside the
/// requested window, either as a bare array or wrapped under `data`.
#[derive(Default)]
pub struct MockTransport {
    readings: HashMap<String, Vec<WireFixture>>,
    wrapped: HashSet<String>,
    failing: HashMap<String, (u16, String)>,
    slow: HashMap<String, Duration>,
    calls: Mutex<Vec<(CentralId, CentralRequest)>>,
    call_count: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(mut self, central: &str, readings: Vec<WireFixture>) -> Self {
        self.readings
            .entry(central.to_string())
            .or_default()
            .extend(readings);
        self
    }

    /// Answer `{ "data": [...] }` instead of a bare array.
    pub fn wrapped(mut self, central: &str) -> Self {
        self.wrapped.insert(central.to_string());
        self
    }

    pub fn failing(mut self, central: &str, status: u16, status_text: &str) -> Self {
        self.failing
            .insert(central.to_string(), (status, status_text.to_string()));
        self
    }

    pub fn slow(mut self, central: &str, delay: Duration) -> Self {
        self.slow.insert(central.to_string(), delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(CentralId, CentralRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, central: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(c, _)| c.as_str() == central)
            .count()
    }
}

fn parse_iso(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
}

#[async_trait]
impl CentralTransport for MockTransport {
    fn endpoint(&self, central: &CentralId) -> String {
        format!("mock://{}/api/rpc/temperature_report", central)
    }

    async fn call(
        &self,
        central: &CentralId,
        request: &CentralRequest,
    ) -> Result<Value, TransportError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((central.clone(), request.clone()));

        if let Some(delay) = self.slow.get(central.as_str()) {
            tokio::time::sleep(*delay).await;
        }
        if let Some((status, text)) = self.failing.get(central.as_str()) {
            return Err(TransportError::new(*status, text.clone()));
        }

        let start = parse_iso(&request.date_start);
        let end = parse_iso(&request.date_end);
        let entries: Vec<Value> = self
            .readings
            .get(central.as_str())
            .map(|readings| {
                readings
                    .iter()
                    .filter(|r| r.timestamp >= start && r.timestamp <= end)
                    .map(|r| {
                        json!({
                            "deviceKey": r.device_key,
                            "timestamp": to_iso_millis(r.timestamp),
                            "value": r.value,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if self.wrapped.contains(central.as_str()) {
            Ok(json!({ "data": entries }))
        } else {
            Ok(Value::Array(entries))
        }
    }
}

// =============================================================================
// Service fixtures
// =============================================================================

/// Four devices across three centrals; `old-gw` is a legacy backend.
pub fn directory() -> DeviceDirectory {
    DeviceDirectory::new(vec![
        DeviceInfo::new("T-01", "Freezer A", "acme"),
        DeviceInfo::new("T-02", "Cold Room", "acme"),
        DeviceInfo::new("T-03", "Lab Fridge", "north"),
        DeviceInfo::new("T-04", "Archive", "old-gw"),
    ])
}

pub fn options() -> PipelineOptions {
    PipelineOptions {
        tz: tz(),
        ..Default::default()
    }
}

pub fn service_with(
    transport: Arc<MockTransport>,
    options: PipelineOptions,
    context: ReportContext,
) -> ReportService {
    ReportService::new(
        directory(),
        RpcAggregationClient::new(transport),
        LegacyNormalizer::new(["old-gw"], qtty::Hours::new(3.0)),
        options,
        context,
    )
}

pub fn service(transport: Arc<MockTransport>) -> ReportService {
    service_with(transport, options(), ReportContext::new())
}
