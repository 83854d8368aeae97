//! In-memory TTL cache of finished reports.
//!
//! Entries are keyed by [`cache_key`](crate::services::orchestrator::cache_key)
//! and live for the process lifetime. Expired entries are replaced on the next
//! write for the same key; nothing sweeps them in the background.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::{MissingSlotMap, ProcessedRow};

/// Default freshness window: 30 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// A stored report.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub written_at: Instant,
    pub rows: Vec<ProcessedRow>,
    pub missing_slots: MissingSlotMap,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh(CacheEntry),
    /// An entry exists but is older than the TTL.
    Stale,
    Miss,
}

/// Shared report cache. Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.lookup(key) {
            CacheLookup::Fresh(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn lookup(&self, key: &str) -> CacheLookup {
        self.lookup_at(key, Instant::now())
    }

    /// Lookup as seen at `now`. An entry exactly `ttl` old is stale.
    pub fn lookup_at(&self, key: &str, now: Instant) -> CacheLookup {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.written_at) < self.ttl => {
                CacheLookup::Fresh(entry.clone())
            }
            Some(_) => CacheLookup::Stale,
            None => CacheLookup::Miss,
        }
    }

    /// Store a report, replacing any previous entry for `key`.
    pub fn put(&self, key: impl Into<String>, rows: Vec<ProcessedRow>, missing_slots: MissingSlotMap) {
        self.put_at(key, rows, missing_slots, Instant::now());
    }

    pub fn put_at(
        &self,
        key: impl Into<String>,
        rows: Vec<ProcessedRow>,
        missing_slots: MissingSlotMap,
        written_at: Instant,
    ) {
        self.entries.write().insert(
            key.into(),
            CacheEntry {
                written_at,
                rows,
                missing_slots,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
