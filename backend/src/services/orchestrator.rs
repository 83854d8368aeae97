//! Query orchestration.
//!
//! A run validates the query, consults the result cache, claims the
//! concurrency guard and then drives the pipeline chunk by chunk:
//!
//! 1. fetch every central's readings for the chunk
//! 2. correct legacy timestamps and resolve device keys
//! 3. accumulate readings per device
//!
//! Once all chunks are in, each device is regularized over the whole query
//! window, clamped, turned into rows, sorted, cached and returned.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReportConfig;
use crate::error::{ReportError, ReportResult};
use crate::models::time::{offset_from_minutes, to_iso_millis};
use crate::models::{
    CentralFailure, CentralId, DeviceDirectory, DeviceId, MissingSlotMap, RawReading,
    ReportOutput, ResultSource,
};
use crate::rpc::{CentralBatch, CentralTransport, RpcAggregationClient};
use crate::services::cache::{CacheLookup, ResultCache};
use crate::services::chunker::{chunk_date_range, local_day_bounds, DEFAULT_CHUNK_DAYS};
use crate::services::clamp::ClampBounds;
use crate::services::guard::ConcurrencyGuard;
use crate::services::normalizer::LegacyNormalizer;
use crate::services::regularizer::{regularize_device, RegularizerOptions, SlotWindow};
use crate::services::rows::{sort_rows, RowBuilder, DEFAULT_TIMESTAMP_FORMAT};

/// Devices and UTC window of one report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub devices: Vec<DeviceId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ReportQuery {
    pub fn new(devices: Vec<DeviceId>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            devices,
            start: Some(start),
            end: Some(end),
        }
    }

    /// Query covering whole local days, `start_date` 00:00 to `end_date` 23:59:59.999.
    pub fn for_local_dates(
        devices: Vec<DeviceId>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        tz: &FixedOffset,
    ) -> Self {
        let bounds = local_day_bounds(start_date, end_date, tz);
        Self {
            devices,
            start: bounds.map(|(start, _)| start),
            end: bounds.map(|(_, end)| end),
        }
    }
}

/// Knobs of the processing stages.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_days: u32,
    pub regularizer: RegularizerOptions,
    pub clamp: ClampBounds,
    pub tz: FixedOffset,
    pub timestamp_format: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_days: DEFAULT_CHUNK_DAYS,
            regularizer: RegularizerOptions::default(),
            clamp: ClampBounds::default(),
            tz: offset_from_minutes(-180).unwrap_or_else(|| Utc.fix()),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Cache and guard shared by every run of a service.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub cache: ResultCache,
    pub guard: ConcurrencyGuard,
}

impl ReportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_ttl(ttl: Duration) -> Self {
        Self {
            cache: ResultCache::with_ttl(ttl),
            guard: ConcurrencyGuard::new(),
        }
    }
}

/// Cache key: sorted central ids joined by `,`, then the ISO start and end.
pub fn cache_key(centrals: &BTreeSet<CentralId>, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let centrals: Vec<&str> = centrals.iter().map(CentralId::as_str).collect();
    format!(
        "{}|{}|{}",
        centrals.join(","),
        to_iso_millis(start),
        to_iso_millis(end)
    )
}

/// Runs report queries end to end.
#[derive(Clone)]
pub struct ReportService {
    directory: Arc<DeviceDirectory>,
    client: RpcAggregationClient,
    normalizer: LegacyNormalizer,
    options: PipelineOptions,
    context: ReportContext,
}

impl ReportService {
    pub fn new(
        directory: DeviceDirectory,
        client: RpcAggregationClient,
        normalizer: LegacyNormalizer,
        options: PipelineOptions,
        context: ReportContext,
    ) -> Self {
        Self {
            directory: Arc::new(directory),
            client,
            normalizer,
            options,
            context,
        }
    }

    /// Build a service from validated configuration.
    pub fn from_config(
        config: &ReportConfig,
        transport: Arc<dyn CentralTransport>,
        context: ReportContext,
    ) -> ReportResult<Self> {
        config.validate()?;
        let client = RpcAggregationClient::new(transport)
            .with_timeout(config.rpc_timeout())
            .with_mode(config.gateway.fetch_mode);
        let normalizer =
            LegacyNormalizer::new(config.legacy.centrals.iter().cloned(), config.legacy.offset_hours);
        let options = PipelineOptions {
            chunk_days: config.report.chunk_days,
            regularizer: RegularizerOptions {
                max_gap_slots: config.report.max_gap_slots,
                include_missing: config.report.include_missing,
                ..Default::default()
            },
            clamp: config.clamp_bounds(),
            tz: config.timezone()?,
            timestamp_format: config.report.timestamp_format.clone(),
        };
        Ok(Self::new(
            config.device_directory(),
            client,
            normalizer,
            options,
            context,
        ))
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    /// Check a query before any network activity and return its UTC window.
    pub fn validate(&self, query: &ReportQuery) -> ReportResult<(DateTime<Utc>, DateTime<Utc>)> {
        let (Some(start), Some(end)) = (query.start, query.end) else {
            return Err(ReportError::invalid_query("start and end dates are required"));
        };
        if start > end {
            return Err(ReportError::invalid_query(format!(
                "start {} is after end {}",
                to_iso_millis(start),
                to_iso_millis(end)
            )));
        }
        if query.devices.is_empty() {
            return Err(ReportError::invalid_query("no devices selected"));
        }
        let unknown: Vec<&str> = query
            .devices
            .iter()
            .filter(|id| !self.directory.contains(id))
            .map(DeviceId::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ReportError::invalid_query(format!(
                "unknown device(s): {}",
                unknown.join(", ")
            )));
        }
        Ok((start, end))
    }

    /// Run a query, serving it from the cache when a fresh result exists.
    ///
    /// # Errors
    /// - `InvalidQuery` when validation fails
    /// - `Busy` when another run is in flight
    /// - `Duplicate` when the query repeats the last completed run and no
    ///   cached result is available
    pub async fn run(&self, query: &ReportQuery) -> ReportResult<ReportOutput> {
        let (start, end) = self.validate(query)?;
        let centrals = self.directory.centrals_for(&query.devices);
        let key = cache_key(&centrals, start, end);

        if self.context.guard.is_in_flight() {
            warn!("Rejecting report {}: another run is in flight", key);
            return Err(ReportError::Busy);
        }

        match self.context.cache.lookup(&key) {
            CacheLookup::Fresh(entry) => {
                info!("Serving report {} from cache ({} rows)", key, entry.rows.len());
                return Ok(ReportOutput {
                    rows: entry.rows,
                    failures: Vec::new(),
                    missing_slots: entry.missing_slots,
                    source: ResultSource::Cached,
                });
            }
            CacheLookup::Stale => self.context.guard.forget_completed(&key),
            CacheLookup::Miss => {}
        }

        let permit = self.context.guard.begin(key.clone())?;
        let run_id = Uuid::new_v4();
        info!(
            "[{}] Starting report {} for {} device(s)",
            run_id,
            key,
            query.devices.len()
        );

        let output = self.execute(run_id, query, start, end).await?;

        self.context
            .cache
            .put(key, output.rows.clone(), output.missing_slots.clone());
        permit.complete();

        info!(
            "[{}] Report finished: {} row(s), {} central failure(s)",
            run_id,
            output.rows.len(),
            output.failures.len()
        );
        Ok(output)
    }

    /// Run the pipeline without consulting the cache or the guard.
    pub async fn execute(
        &self,
        run_id: Uuid,
        query: &ReportQuery,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ReportResult<ReportOutput> {
        let tz = self.options.tz;
        let chunks = chunk_date_range(start, end, self.options.chunk_days, &tz);
        let batches: Vec<CentralBatch> = self
            .directory
            .group_by_central(&query.devices)
            .into_iter()
            .map(|(central, devices)| CentralBatch::new(central, devices))
            .collect();
        let selected: BTreeSet<&DeviceId> = query.devices.iter().collect();

        let mut per_device: BTreeMap<DeviceId, Vec<RawReading>> = BTreeMap::new();
        let mut failures: Vec<CentralFailure> = Vec::new();
        let mut unresolved = 0usize;

        for (index, chunk) in chunks.iter().enumerate() {
            debug!(
                "[{}] Chunk {}/{}: {} .. {}",
                run_id,
                index + 1,
                chunks.len(),
                to_iso_millis(chunk.start),
                to_iso_millis(chunk.end)
            );
            let fetch = self.client.fetch_chunk(chunk, &batches).await;
            failures.extend(fetch.failures);

            for (central, readings) in fetch.readings {
                for reading in self.normalizer.normalize(&central, readings) {
                    match self.directory.resolve(&reading.device_key) {
                        Some(info) if selected.contains(&info.id) => {
                            per_device.entry(info.id.clone()).or_default().push(reading);
                        }
                        Some(_) => {}
                        None => unresolved += 1,
                    }
                }
            }
        }

        if unresolved > 0 {
            warn!("[{}] Ignored {} reading(s) with unknown device keys", run_id, unresolved);
        }

        let builder = RowBuilder::new(tz, self.options.clamp, self.options.timestamp_format.clone());
        let window = SlotWindow::new(start, end);
        let mut rows = Vec::new();
        let mut missing_slots = MissingSlotMap::new();

        for (device, readings) in &per_device {
            let info = self.directory.get(device).ok_or_else(|| {
                ReportError::pipeline(format!("device {} vanished from the directory", device))
            })?;
            let series = regularize_device(device, readings, window, &self.options.regularizer, &tz);
            debug!(
                "[{}] {}: {} real, {} interpolated, {} missing slot(s)",
                run_id,
                device,
                series.real_count(),
                series.interpolated_count(),
                series.missing_slots.len()
            );
            if !series.missing_slots.is_empty() {
                missing_slots.insert(device.clone(), series.missing_slots.iter().copied().collect());
            }
            rows.extend(builder.build(&info.central, &info.label, &series));
        }

        sort_rows(&mut rows);

        Ok(ReportOutput {
            rows,
            failures,
            missing_slots,
            source: ResultSource::Fresh,
        })
    }
}
