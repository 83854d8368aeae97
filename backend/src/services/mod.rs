//! Service layer for the temperature report pipeline.
//!
//! Each stage is a small, independently testable unit. The
//! [`orchestrator`] wires them together behind the result cache and the
//! concurrency guard:
//!
//! chunker -> rpc client -> normalizer -> regularizer -> clamp -> rows

pub mod cache;
pub mod chunker;
pub mod clamp;
pub mod guard;
pub mod interpolation;
pub mod normalizer;
pub mod orchestrator;
pub mod regularizer;
pub mod rows;


pub use cache::{CacheEntry, CacheLookup, ResultCache, DEFAULT_CACHE_TTL};
pub use chunker::{chunk_date_range, local_day_bounds, DEFAULT_CHUNK_DAYS};
pub use clamp::{clamp_temperature, ClampBounds, ClampedValue};
pub use guard::{ConcurrencyGuard, GuardRejection, RunPermit};
pub use normalizer::LegacyNormalizer;
pub use orchestrator::{cache_key, PipelineOptions, ReportContext, ReportQuery, ReportService};
pub use regularizer::{regularize_device, RegularizerOptions, SlotWindow};
pub use rows::{sort_rows, RowBuilder};
