//! Day boundaries for timeline queries.
//!
//! All days are anchored at UTC midnight. Ingestion timestamps are UTC as
//! well, so a calendar date always maps to exactly 24 hours of snapshots.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

/// Calendar years accepted at the boundary. Timestamps in these years render
/// with a four-digit year, so their RFC 3339 text sorts chronologically.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 0..=9999;

/// Returns true if `date` falls in [`SUPPORTED_YEARS`].
pub fn is_supported(date: NaiveDate) -> bool {
    SUPPORTED_YEARS.contains(&date.year())
}

/// A half-open `[start, end)` window scoping one timeline query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayBounds {
    /// Bounds for a calendar date: UTC midnight to the following midnight.
    ///
    /// The end saturates at `DateTime::<Utc>::MAX_UTC` for the last
    /// representable date.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start
                .checked_add_signed(Duration::days(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Bounds for the current UTC date.
    pub fn today() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    /// Inclusive start of the window.
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end of the window.
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `timestamp` falls inside the window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}
