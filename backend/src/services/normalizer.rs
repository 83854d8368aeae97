//! Correction of timestamps reported by legacy centrals.
//!
//! Legacy gateways format instants with a timezone-aware routine and end up
//! reporting them shifted forward by a fixed amount. Correcting once here keeps
//! the regularizer backend-agnostic. The set of legacy centrals is static
//! configuration and never inferred from the data.

use std::collections::HashSet;

use chrono::TimeDelta;

use crate::models::{CentralId, RawReading};

/// Default shift applied to legacy central timestamps.
pub const DEFAULT_LEGACY_OFFSET_HOURS: f64 = 3.0;

/// Shifts legacy-central readings back by a fixed offset.
#[derive(Debug, Clone)]
pub struct LegacyNormalizer {
    legacy: HashSet<CentralId>,
    offset: TimeDelta,
}

impl Default for LegacyNormalizer {
    fn default() -> Self {
        Self::new(Vec::<CentralId>::new(), qtty::Hours::new(DEFAULT_LEGACY_OFFSET_HOURS))
    }
}

impl LegacyNormalizer {
    pub fn new<I, C>(legacy: I, offset: qtty::Hours) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CentralId>,
    {
        let millis = offset.to::<qtty::Millisecond>().value().round() as i64;
        Self {
            legacy: legacy.into_iter().map(Into::into).collect(),
            offset: TimeDelta::milliseconds(millis),
        }
    }

    pub fn is_legacy(&self, central: &CentralId) -> bool {
        self.legacy.contains(central)
    }

    pub fn offset(&self) -> TimeDelta {
        self.offset
    }

    /// Return `readings` with the legacy correction applied when `central`
    /// is a legacy backend, unchanged otherwise.
    pub fn normalize(&self, central: &CentralId, mut readings: Vec<RawReading>) -> Vec<RawReading> {
        if !self.is_legacy(central) {
            return readings;
        }
        for reading in &mut readings {
            reading.timestamp -= self.offset;
        }
        readings
    }
}
