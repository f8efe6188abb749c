//! Timeline query service.

use chrono::{NaiveDate, Utc};

use crate::day::DayBounds;
use crate::snapshot::PresenceSnapshot;
use crate::store::{EventStore, ReadError, WriteError};
use crate::timeline::{StatusInterval, reconstruct};
use crate::types::{GuildId, UserId};

/// Records snapshots and answers timeline queries against one store handle.
///
/// The service owns no state besides the handle; pass `&Database` or an
/// `Arc` to share a store between ingestion and queries.
#[derive(Debug, Clone)]
pub struct TimelineService<S> {
    store: S,
}

impl<S: EventStore> TimelineService<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Ingest path: appends one snapshot.
    pub fn record(&self, snapshot: &PresenceSnapshot) -> Result<(), WriteError> {
        self.store.append(snapshot)
    }

    /// Reconstructs the status timeline of `user` in `guild` for a UTC date.
    pub fn timeline(
        &self,
        user: UserId,
        guild: GuildId,
        date: NaiveDate,
    ) -> Result<Vec<StatusInterval>, ReadError> {
        let day = DayBounds::for_date(date);
        let snapshots = self.store.scan(user, guild, day)?;
        let intervals = reconstruct(&snapshots, day);
        tracing::debug!(
            %user,
            %guild,
            %date,
            snapshots = snapshots.len(),
            intervals = intervals.len(),
            "reconstructed timeline"
        );
        Ok(intervals)
    }

    /// Same as [`Self::timeline`] for the current UTC date.
    pub fn timeline_today(
        &self,
        user: UserId,
        guild: GuildId,
    ) -> Result<Vec<StatusInterval>, ReadError> {
        self.timeline(user, guild, Utc::now().date_naive())
    }
}
