//! Per-device series regularization.
//!
//! Turns a device's irregular readings into an evenly spaced 30-minute series:
//!
//! 1. Snap every reading to its nearest canonical slot (last write wins).
//! 2. Lay the slots out on a timeline running from the device's first to its
//!    last real slot, so nothing is synthesized outside that range.
//! 3. Detect gaps (maximal runs of empty slots) on that timeline. A run that
//!    spans local midnight is one gap, which is what lets the same-day rule
//!    below see it.
//! 4. Fill a gap only when it is at most `max_gap_slots` long and starts and
//!    ends on the same local day; other empty slots are reported missing.
//! 5. Emit points for every local day that has at least one real reading,
//!    00:00 to 23:30 clipped to the timeline.
//!
//! The regularizer never fails. Readings outside the slot window are ignored.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::models::time::{
    canonical_slot, last_slot_of_day, local_date, local_midnight, slot_step, SLOT_MILLIS,
};
use crate::models::{DeviceId, Gap, MissingReason, RawReading, RegularizedSeries, SeriesPoint};
use crate::services::interpolation::{neighbor_mean, synthesize, InterpolationWeights};

/// Longest gap (in slots) that may be filled: 8 slots, four hours.
pub const DEFAULT_MAX_GAP_SLOTS: usize = 8;

/// Tunables for [`regularize_device`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularizerOptions {
    pub max_gap_slots: usize,
    /// Emit unfillable slots as `missing` points instead of dropping them.
    pub include_missing: bool,
    pub weights: InterpolationWeights,
}

impl Default for RegularizerOptions {
    fn default() -> Self {
        Self {
            max_gap_slots: DEFAULT_MAX_GAP_SLOTS,
            include_missing: false,
            weights: InterpolationWeights::default(),
        }
    }
}

/// Inclusive bounds on the canonical slots a series may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl SlotWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, slot: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| slot >= start) && self.end.map_or(true, |end| slot <= end)
    }
}

/// Map canonical slot -> value. Later readings overwrite earlier ones that
/// snap to the same slot.
pub fn canonicalize(readings: &[RawReading], window: SlotWindow) -> BTreeMap<DateTime<Utc>, f64> {
    let mut slots = BTreeMap::new();
    for reading in readings {
        let slot = canonical_slot(reading.timestamp);
        if window.contains(slot) {
            slots.insert(slot, reading.value);
        }
    }
    slots
}

/// Group consecutive empty timeline positions into gaps.
///
/// `origin` is the slot instant of `timeline[0]`.
pub fn find_gaps(timeline: &[Option<f64>], origin: DateTime<Utc>) -> Vec<Gap> {
    let slot_at = |index: usize| origin + slot_step() * index as i32;
    let mut gaps = Vec::new();
    let mut run_start: Option<usize> = None;

    for (index, value) in timeline.iter().enumerate() {
        match (value, run_start) {
            (None, None) => run_start = Some(index),
            (Some(_), Some(start)) => {
                gaps.push(make_gap(start, index - 1, &slot_at));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        gaps.push(make_gap(start, timeline.len() - 1, &slot_at));
    }

    gaps
}

fn make_gap(start: usize, end: usize, slot_at: &impl Fn(usize) -> DateTime<Utc>) -> Gap {
    Gap {
        start_index: start,
        end_index: end,
        start_slot: slot_at(start),
        end_slot: slot_at(end),
        size: end - start + 1,
    }
}

/// `None` when the gap may be filled, otherwise why it may not.
pub fn classify_gap(gap: &Gap, max_gap_slots: usize, tz: &FixedOffset) -> Option<MissingReason> {
    if gap.size > max_gap_slots {
        Some(MissingReason::GapTooLarge)
    } else if local_date(gap.start_slot, tz) != local_date(gap.end_slot, tz) {
        Some(MissingReason::CrossesMidnight)
    } else {
        None
    }
}

/// Regularize one device's readings.
///
/// Returns an empty series when no reading falls inside `window`.
pub fn regularize_device(
    device: &DeviceId,
    readings: &[RawReading],
    window: SlotWindow,
    options: &RegularizerOptions,
    tz: &FixedOffset,
) -> RegularizedSeries {
    let slots = canonicalize(readings, window);
    let (Some(&first), Some(&last)) = (slots.keys().next(), slots.keys().next_back()) else {
        return RegularizedSeries::default();
    };

    let len = ((last - first).num_milliseconds() / SLOT_MILLIS) as usize + 1;
    let mut timeline: Vec<Option<f64>> = vec![None; len];
    for (slot, value) in &slots {
        timeline[index_of(first, *slot)] = Some(*value);
    }

    let gaps = find_gaps(&timeline, first);
    let verdicts: Vec<Option<MissingReason>> = gaps
        .iter()
        .map(|gap| classify_gap(gap, options.max_gap_slots, tz))
        .collect();
    let mut gap_of: Vec<Option<usize>> = vec![None; len];
    for (gap_index, gap) in gaps.iter().enumerate() {
        for slot in gap_of.iter_mut().take(gap.end_index + 1).skip(gap.start_index) {
            *slot = Some(gap_index);
        }
    }

    let days: BTreeSet<NaiveDate> = slots.keys().map(|slot| local_date(*slot, tz)).collect();
    let mut points = Vec::new();
    let mut missing_slots = Vec::new();

    for day in days {
        let from = index_of(first, local_midnight(day, tz).max(first));
        let to = index_of(first, last_slot_of_day(day, tz).min(last));

        for index in from..=to {
            let slot = first + slot_step() * index as i32;
            if let Some(value) = timeline[index] {
                points.push(SeriesPoint::real(slot, value));
                continue;
            }
            let Some(gap_index) = gap_of[index] else {
                continue;
            };
            let gap = &gaps[gap_index];
            match verdicts[gap_index] {
                None => {
                    let neighbors = neighbor_mean(&timeline, index);
                    let value = synthesize(device.as_str(), slot, neighbors, &options.weights, tz);
                    points.push(SeriesPoint::interpolated(slot, value, gap.size));
                }
                Some(reason) => {
                    missing_slots.push(slot);
                    if options.include_missing {
                        points.push(SeriesPoint::missing(slot, gap.size, reason));
                    }
                }
            }
        }
    }

    RegularizedSeries {
        device: Some(device.clone()),
        points,
        gaps,
        missing_slots,
    }
}

fn index_of(origin: DateTime<Utc>, slot: DateTime<Utc>) -> usize {
    ((slot - origin).num_milliseconds() / SLOT_MILLIS) as usize
}
