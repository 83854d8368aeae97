//! Slot arithmetic and local-calendar helpers.
//!
//! All instants travel through the pipeline as `DateTime<Utc>`. The report's
//! calendar (day boundaries, time-of-day bands, display strings) is expressed
//! in a fixed UTC offset that must be a whole multiple of the slot length, so
//! UTC slot boundaries and local slot boundaries coincide.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, Timelike, Utc};

/// Length of one canonical slot in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// Length of one canonical slot in milliseconds.
pub const SLOT_MILLIS: i64 = SLOT_MINUTES * 60 * 1000;

/// Number of canonical slots in one local calendar day (00:00 ..= 23:30).
pub const SLOTS_PER_DAY: i64 = 24 * 60 / SLOT_MINUTES;

/// One canonical slot as a `TimeDelta`.
pub fn slot_step() -> TimeDelta {
    TimeDelta::milliseconds(SLOT_MILLIS)
}

/// Snap an instant to its nearest slot boundary by epoch-millisecond rounding.
///
/// Halves round up, so `08:15:00.000` snaps to `08:30`.
pub fn canonical_slot(ts: DateTime<Utc>) -> DateTime<Utc> {
    let millis = ts.timestamp_millis();
    let snapped = (millis + SLOT_MILLIS / 2).div_euclid(SLOT_MILLIS) * SLOT_MILLIS;
    DateTime::from_timestamp_millis(snapped).unwrap_or(ts)
}

/// Whether the offset keeps local slot boundaries aligned with UTC ones.
pub fn is_slot_aligned_offset(tz: &FixedOffset) -> bool {
    i64::from(tz.local_minus_utc()) % (SLOT_MINUTES * 60) == 0
}

/// Local calendar date of an instant.
pub fn local_date(ts: DateTime<Utc>, tz: &FixedOffset) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Minutes elapsed since local midnight.
pub fn local_minute_of_day(ts: DateTime<Utc>, tz: &FixedOffset) -> u32 {
    let local = ts.with_timezone(tz);
    local.hour() * 60 + local.minute()
}

/// UTC instant of local midnight for `date`.
pub fn local_midnight(date: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    naive.and_utc() - TimeDelta::seconds(i64::from(tz.local_minus_utc()))
}

/// UTC instant of the last canonical slot (23:30 local) of `date`.
pub fn last_slot_of_day(date: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    local_midnight(date, tz) + TimeDelta::milliseconds(SLOT_MILLIS * (SLOTS_PER_DAY - 1))
}

/// ISO-8601 instant with millisecond precision and a `Z` suffix.
///
/// This is the representation used in RPC bodies and cache keys.
pub fn to_iso_millis(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build a fixed offset from a signed minute count.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
}
