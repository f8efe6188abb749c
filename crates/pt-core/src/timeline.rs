//! Timeline reconstruction.
//!
//! Turns the ordered snapshots of one (user, guild, day) into status
//! intervals with a single forward pass.
//!
//! # Algorithm Summary
//!
//! For each row `i`:
//! 1. `status(i)` is the normalized status, possibly absent.
//! 2. `next(i)` is the timestamp of row `i + 1`, or the end of the day. The
//!    successor is positional, so absent rows count.
//! 3. `prev(i)` is the status of row `i - 1` as stored, absent included.
//! 4. Row `i` emits `[ts(i), next(i))` when it has a status and that status
//!    differs from `prev(i)` (or it is the first row).
//!
//! Absent rows never emit. Because they still act as `prev`, a status that
//! resumes after an absent row always starts a new interval, even when it
//! equals the status before the gap. Those intervals are not merged: the gap
//! stays visible as a hole in the timeline.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::day::DayBounds;
use crate::snapshot::PresenceSnapshot;
use crate::status::PresenceStatus;

/// A half-open `[start, end)` range during which a status was last known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInterval {
    #[serde(rename = "startTime")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end: DateTime<Utc>,
    pub status: PresenceStatus,
}

impl StatusInterval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A row the reconstructor can consume.
///
/// Implemented by [`PresenceSnapshot`]; tests and other callers can feed
/// lighter fixtures.
pub trait StatusSample {
    /// When the sample was observed.
    fn timestamp(&self) -> DateTime<Utc>;

    /// The canonical status, or `None` when no platform reported one.
    fn status(&self) -> Option<PresenceStatus>;
}

impl StatusSample for PresenceSnapshot {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn status(&self) -> Option<PresenceStatus> {
        self.client_status.canonical()
    }
}

impl<S: StatusSample> StatusSample for &S {
    fn timestamp(&self) -> DateTime<Utc> {
        (*self).timestamp()
    }

    fn status(&self) -> Option<PresenceStatus> {
        (*self).status()
    }
}

/// Reconstructs status intervals from samples ordered by timestamp.
///
/// Samples are expected to lie within `day`; the store's scan guarantees
/// that. The last emitted interval is clamped to `day.end()`. Samples that
/// share a timestamp collapse to the last of them: earlier ones are dropped
/// before the change rules apply, so they neither emit nor count as the
/// previous row.
pub fn reconstruct<S: StatusSample>(samples: &[S], day: DayBounds) -> Vec<StatusInterval> {
    let mut intervals = Vec::new();
    // Outer None: no previous row. Inner None: previous row was absent.
    let mut prev: Option<Option<PresenceStatus>> = None;

    for (i, sample) in samples.iter().enumerate() {
        let start = sample.timestamp();
        let end = samples.get(i + 1).map_or(day.end(), |next| next.timestamp());
        debug_assert!(
            i + 1 == samples.len() || start <= end,
            "samples must be ordered by timestamp"
        );
        if start == end && i + 1 < samples.len() {
            continue;
        }

        let status = sample.status();
        if let Some(current) = status {
            let changed = prev.is_none_or(|previous| previous != Some(current));
            if changed && start < end {
                intervals.push(StatusInterval {
                    start,
                    end,
                    status: current,
                });
            }
        }
        prev = Some(status);
    }

    intervals
}

/// Time spent in each status over a reconstructed timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSummary {
    /// Sum of all interval durations. Absence gaps are not counted.
    pub tracked: StdDuration,
    /// Per-status totals in [`PresenceStatus::ALL`] order, zero entries omitted.
    pub by_status: Vec<(PresenceStatus, StdDuration)>,
}

/// Totals interval durations per status.
pub fn summarize(intervals: &[StatusInterval]) -> TimelineSummary {
    let mut totals = [StdDuration::ZERO; PresenceStatus::ALL.len()];
    for interval in intervals {
        let slot = PresenceStatus::ALL
            .iter()
            .position(|status| *status == interval.status)
            .unwrap_or_default();
        totals[slot] += interval.duration().to_std().unwrap_or_default();
    }

    let by_status = PresenceStatus::ALL
        .into_iter()
        .zip(totals)
        .filter(|(_, total)| !total.is_zero())
        .collect();

    TimelineSummary {
        tracked: totals.iter().sum(),
        by_status,
    }
}
