//! Storage contract for presence snapshots.
//!
//! The store is an append-only log. Implementations must make each append
//! individually atomic and allow scans to run while other threads append.

use std::sync::Arc;

use thiserror::Error;

use crate::day::DayBounds;
use crate::snapshot::PresenceSnapshot;
use crate::types::{GuildId, UserId};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Appending a snapshot failed. Not retried by the store.
#[derive(Debug, Error)]
#[error("failed to append presence snapshot")]
pub struct WriteError {
    #[source]
    source: BoxError,
}

impl WriteError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Scanning snapshots failed.
#[derive(Debug, Error)]
#[error("failed to scan presence snapshots")]
pub struct ReadError {
    #[source]
    source: BoxError,
}

impl ReadError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Durable, append-only log of presence snapshots.
pub trait EventStore: Send + Sync {
    /// Records one snapshot. No ordering or uniqueness is enforced.
    fn append(&self, snapshot: &PresenceSnapshot) -> Result<(), WriteError>;

    /// Returns every snapshot for `user` in `guild` whose timestamp falls in
    /// `day`, ascending by timestamp. Ties keep a stable order.
    fn scan(
        &self,
        user: UserId,
        guild: GuildId,
        day: DayBounds,
    ) -> Result<Vec<PresenceSnapshot>, ReadError>;
}

impl<T: EventStore + ?Sized> EventStore for &T {
    fn append(&self, snapshot: &PresenceSnapshot) -> Result<(), WriteError> {
        (**self).append(snapshot)
    }

    fn scan(
        &self,
        user: UserId,
        guild: GuildId,
        day: DayBounds,
    ) -> Result<Vec<PresenceSnapshot>, ReadError> {
        (**self).scan(user, guild, day)
    }
}

impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn append(&self, snapshot: &PresenceSnapshot) -> Result<(), WriteError> {
        (**self).append(snapshot)
    }

    fn scan(
        &self,
        user: UserId,
        guild: GuildId,
        day: DayBounds,
    ) -> Result<Vec<PresenceSnapshot>, ReadError> {
        (**self).scan(user, guild, day)
    }
}
