//! Report configuration file support.
//!
//! Configuration is read from TOML and may be adjusted through environment
//! variables:
//!
//! - `REPORT_CONFIG`: explicit path to the configuration file
//! - `REPORT_GATEWAY_URL`: gateway URL template (must contain `{central}`)
//! - `REPORT_RPC_TIMEOUT_SECS`: per-request timeout in seconds
//!
//! ```toml
//! [gateway]
//! url_template = "https://{central}.gateway.local/api/rpc/temperature_report"
//! timeout_secs = 120
//! fetch_mode = "sequential"
//!
//! [report]
//! chunk_days = 30
//! utc_offset_minutes = -180
//!
//! [legacy]
//! centrals = ["old-gw"]
//! offset_hours = 3
//!
//! [[devices]]
//! id = "T-01"
//! label = "Freezer A"
//! central = "acme"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;

use crate::error::{ReportError, ReportResult};
use crate::models::time::{is_slot_aligned_offset, offset_from_minutes};
use crate::models::{DeviceDirectory, DeviceInfo};
use crate::rpc::{FetchMode, DEFAULT_URL_TEMPLATE};
use crate::services::chunker::DEFAULT_CHUNK_DAYS;
use crate::services::clamp::{ClampBounds, MAX_TEMPERATURE, MIN_TEMPERATURE};
use crate::services::normalizer::DEFAULT_LEGACY_OFFSET_HOURS;
use crate::services::regularizer::DEFAULT_MAX_GAP_SLOTS;
use crate::services::rows::DEFAULT_TIMESTAMP_FORMAT;

/// Complete report configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub legacy: LegacySettings,
    #[serde(default)]
    pub clamp: ClampSettings,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Central gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: qtty::Seconds,
    #[serde(default)]
    pub fetch_mode: FetchMode,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            timeout_secs: default_timeout(),
            fetch_mode: FetchMode::default(),
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_chunk_days")]
    pub chunk_days: u32,
    #[serde(default = "default_max_gap_slots")]
    pub max_gap_slots: usize,
    #[serde(default)]
    pub include_missing: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: qtty::Minutes,
    /// Local calendar offset from UTC, in minutes.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            chunk_days: default_chunk_days(),
            max_gap_slots: default_max_gap_slots(),
            include_missing: false,
            cache_ttl_minutes: default_cache_ttl(),
            utc_offset_minutes: default_utc_offset_minutes(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// Centrals whose timestamps need the legacy correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySettings {
    #[serde(default)]
    pub centrals: Vec<String>,
    #[serde(default = "default_legacy_offset")]
    pub offset_hours: qtty::Hours,
}

impl Default for LegacySettings {
    fn default() -> Self {
        Self {
            centrals: Vec::new(),
            offset_hours: default_legacy_offset(),
        }
    }
}

/// Valid temperature range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClampSettings {
    #[serde(default = "default_min_temperature")]
    pub min: f64,
    #[serde(default = "default_max_temperature")]
    pub max: f64,
}

impl Default for ClampSettings {
    fn default() -> Self {
        Self {
            min: MIN_TEMPERATURE,
            max: MAX_TEMPERATURE,
        }
    }
}

/// One configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    /// Display label; defaults to the identifier.
    #[serde(default)]
    pub label: Option<String>,
    pub central: String,
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_timeout() -> qtty::Seconds {
    qtty::Seconds::new(120.0)
}

fn default_chunk_days() -> u32 {
    DEFAULT_CHUNK_DAYS
}

fn default_max_gap_slots() -> usize {
    DEFAULT_MAX_GAP_SLOTS
}

fn default_cache_ttl() -> qtty::Minutes {
    qtty::Minutes::new(30.0)
}

fn default_utc_offset_minutes() -> i32 {
    -180
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_legacy_offset() -> qtty::Hours {
    qtty::Hours::new(DEFAULT_LEGACY_OFFSET_HOURS)
}

fn default_min_temperature() -> f64 {
    MIN_TEMPERATURE
}

fn default_max_temperature() -> f64 {
    MAX_TEMPERATURE
}

fn non_negative_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

impl ReportConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `ReportError::Configuration` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ReportResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ReportError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> ReportResult<Self> {
        toml::from_str(content)
            .map_err(|e| ReportError::configuration(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration from the default location.
    ///
    /// Uses `REPORT_CONFIG` when set, otherwise searches for `report.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> ReportResult<Self> {
        if let Ok(path) = env::var("REPORT_CONFIG") {
            return Self::from_file(path);
        }

        let search_paths = [
            PathBuf::from("report.toml"),
            PathBuf::from("backend/report.toml"),
            PathBuf::from("../report.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ReportError::configuration(
            "No report.toml found in standard locations",
        ))
    }

    /// Apply `REPORT_GATEWAY_URL` and `REPORT_RPC_TIMEOUT_SECS`.
    pub fn apply_env_overrides(&mut self) -> ReportResult<()> {
        self.apply_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ReportResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REPORT_GATEWAY_URL") {
            self.gateway.url_template = url;
        }
        if let Some(raw) = lookup("REPORT_RPC_TIMEOUT_SECS") {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                ReportError::configuration(format!(
                    "REPORT_RPC_TIMEOUT_SECS must be a number of seconds, got '{}'",
                    raw
                ))
            })?;
            self.gateway.timeout_secs = qtty::Seconds::new(secs);
        }
        Ok(())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> ReportResult<()> {
        if !self.gateway.url_template.contains("{central}") {
            return Err(ReportError::configuration(
                "gateway.url_template must contain a {central} placeholder",
            ));
        }
        if self.rpc_timeout().is_zero() {
            return Err(ReportError::configuration(
                "gateway.timeout_secs must be positive",
            ));
        }
        let tz = offset_from_minutes(self.report.utc_offset_minutes).ok_or_else(|| {
            ReportError::configuration(format!(
                "report.utc_offset_minutes out of range: {}",
                self.report.utc_offset_minutes
            ))
        })?;
        if !is_slot_aligned_offset(&tz) {
            return Err(ReportError::configuration(
                "report.utc_offset_minutes must be a multiple of 30",
            ));
        }
        if !(self.clamp.min.is_finite() && self.clamp.max.is_finite())
            || self.clamp.min > self.clamp.max
        {
            return Err(ReportError::configuration(format!(
                "invalid clamp range [{}, {}]",
                self.clamp.min, self.clamp.max
            )));
        }
        if self.report.timestamp_format.trim().is_empty() {
            return Err(ReportError::configuration(
                "report.timestamp_format must not be empty",
            ));
        }
        for device in &self.devices {
            if device.id.trim().is_empty() {
                return Err(ReportError::configuration("device with an empty id"));
            }
            if device.central.trim().is_empty() {
                return Err(ReportError::configuration(format!(
                    "device {} has no central",
                    device.id
                )));
            }
        }
        Ok(())
    }

    /// Local calendar offset.
    pub fn timezone(&self) -> ReportResult<FixedOffset> {
        offset_from_minutes(self.report.utc_offset_minutes).ok_or_else(|| {
            ReportError::configuration(format!(
                "report.utc_offset_minutes out of range: {}",
                self.report.utc_offset_minutes
            ))
        })
    }

    pub fn device_directory(&self) -> DeviceDirectory {
        DeviceDirectory::new(self.devices.iter().map(|d| {
            DeviceInfo::new(
                d.id.clone(),
                d.label.clone().unwrap_or_else(|| d.id.clone()),
                d.central.clone(),
            )
        }))
    }

    pub fn clamp_bounds(&self) -> ClampBounds {
        ClampBounds::new(self.clamp.min, self.clamp.max)
    }

    pub fn rpc_timeout(&self) -> Duration {
        non_negative_duration(self.gateway.timeout_secs.value())
    }

    pub fn cache_ttl(&self) -> Duration {
        non_negative_duration(self.report.cache_ttl_minutes.to::<qtty::Second>().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[gateway]
url_template = "https://{central}.example.net/api/rpc/temperature_report"
timeout_secs = 45
fetch_mode = "concurrent"

[report]
chunk_days = 7
include_missing = true
cache_ttl_minutes = 10
utc_offset_minutes = -180

[legacy]
centrals = ["old-gw"]
offset_hours = 3

[clamp]
min = 15.0
max = 30.0

[[devices]]
id = "T-01"
label = "Freezer A"
central = "acme"

[[devices]]
id = "T-02"
central = "old-gw"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = ReportConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.gateway.fetch_mode, FetchMode::Concurrent);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(45));
        assert_eq!(config.report.chunk_days, 7);
        assert!(config.report.include_missing);
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.legacy.centrals, vec!["old-gw".to_string()]);
        assert_eq!(config.clamp_bounds(), ClampBounds::new(15.0, 30.0));
        assert_eq!(config.timezone().unwrap().local_minus_utc(), -3 * 3600);
        config.validate().unwrap();

        let directory = config.device_directory();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.resolve("Freezer A").unwrap().id.as_str(), "T-01");
        assert_eq!(directory.resolve("T-02").unwrap().label, "T-02");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ReportConfig::parse("").unwrap();
        assert_eq!(config.gateway.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(120));
        assert_eq!(config.cache_ttl(), Duration::from_secs(30 * 60));
        assert_eq!(config.report.chunk_days, DEFAULT_CHUNK_DAYS);
        assert_eq!(config.report.max_gap_slots, DEFAULT_MAX_GAP_SLOTS);
        assert_eq!(config.gateway.fetch_mode, FetchMode::Sequential);
        assert!(config.devices.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ReportConfig::from_file(file.path()).unwrap();
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ReportConfig::parse("[report\nchunk_days = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_overrides() {
        let mut config = ReportConfig::default();
        config
            .apply_overrides_from(|name| match name {
                "REPORT_GATEWAY_URL" => Some("http://localhost:9000/{central}".to_string()),
                "REPORT_RPC_TIMEOUT_SECS" => Some("5".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.gateway.url_template, "http://localhost:9000/{central}");
        assert_eq!(config.rpc_timeout(), Duration::from_secs(5));

        let err = config
            .apply_overrides_from(|name| (name == "REPORT_RPC_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("REPORT_RPC_TIMEOUT_SECS"));
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let mut config = ReportConfig::default();
        config.report.utc_offset_minutes = 45;
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.gateway.url_template = "https://fixed.example.net".to_string();
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.clamp = ClampSettings { min: 30.0, max: 10.0 };
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.devices.push(DeviceEntry {
            id: "T-01".to_string(),
            label: None,
            central: " ".to_string(),
        });
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.gateway.timeout_secs = qtty::Seconds::new(0.0);
        assert!(config.validate().is_err());
    }
}
