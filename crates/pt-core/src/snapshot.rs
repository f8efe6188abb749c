//! Raw presence snapshots as delivered by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{ClientStatus, PresenceStatus};
use crate::types::{GuildId, UserId};

/// Payload stored when an event carries no activities.
pub const EMPTY_ACTIVITIES: &str = "[]";

/// One observed presence record for a user in a guild.
///
/// Snapshots are immutable facts. Identical consecutive snapshots are legal
/// and are stored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// When the presence change was observed.
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub guild_id: GuildId,
    /// Per-platform statuses.
    #[serde(default)]
    pub client_status: ClientStatus,
    /// Serialized activities JSON, passed through untouched.
    #[serde(default = "empty_activities")]
    pub activities: String,
}

fn empty_activities() -> String {
    EMPTY_ACTIVITIES.to_string()
}

impl PresenceSnapshot {
    /// Creates a snapshot with no activities.
    pub fn new(
        timestamp: DateTime<Utc>,
        user_id: UserId,
        guild_id: GuildId,
        client_status: ClientStatus,
    ) -> Self {
        Self {
            timestamp,
            user_id,
            guild_id,
            client_status,
            activities: empty_activities(),
        }
    }

    /// Replaces the activities payload.
    #[must_use]
    pub fn with_activities(mut self, activities: impl Into<String>) -> Self {
        self.activities = activities.into();
        self
    }

    /// The canonical status of this snapshot, or `None` when absent.
    pub const fn status(&self) -> Option<PresenceStatus> {
        self.client_status.canonical()
    }
}
