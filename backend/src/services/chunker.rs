//! Splitting of a query window into local-calendar chunks.
//!
//! Each chunk becomes one RPC request per central, which keeps individual
//! payloads small on long ranges.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeDelta, Utc};

use crate::models::time::{local_date, local_midnight};
use crate::models::DateChunk;

/// Default chunk length in local days.
pub const DEFAULT_CHUNK_DAYS: u32 = 30;

fn one_milli() -> TimeDelta {
    TimeDelta::milliseconds(1)
}

/// Split `[start, end]` into consecutive chunks of at most `chunk_days` local days.
///
/// Chunks are contiguous (each starts 1 ms after the previous one ends) and the
/// last one is clipped to `end`. Returns nothing when `start > end`. A
/// `chunk_days` of zero is treated as one.
pub fn chunk_date_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    chunk_days: u32,
    tz: &FixedOffset,
) -> Vec<DateChunk> {
    let mut chunks = Vec::new();
    if start > end {
        return chunks;
    }

    let days = u64::from(chunk_days.max(1));
    let mut cursor = start;

    while cursor <= end {
        let first_day = local_date(cursor, tz);
        let chunk_end = match first_day.checked_add_days(Days::new(days)) {
            Some(next_day) => (local_midnight(next_day, tz) - one_milli()).min(end),
            None => end,
        };
        chunks.push(DateChunk::new(cursor, chunk_end));
        cursor = chunk_end + one_milli();
    }

    chunks
}

/// UTC bounds of a picked local date range: 00:00:00.000 of `start_date`
/// through 23:59:59.999 of `end_date`.
pub fn local_day_bounds(
    start_date: NaiveDate,
    end_date: NaiveDate,
    tz: &FixedOffset,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let after_end = end_date.succ_opt()?;
    Some((
        local_midnight(start_date, tz),
        local_midnight(after_end, tz) - one_milli(),
    ))
}
