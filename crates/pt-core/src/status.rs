//! Presence statuses and the per-platform normalizer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical presence status reported by a client platform.
///
/// Variant order is the display order used for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PresenceStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

impl PresenceStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 4] = [Self::Online, Self::Idle, Self::Dnd, Self::Offline];

    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Idle => "Idle",
            Self::Dnd => "Do Not Disturb",
            Self::Offline => "Offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::Dnd),
            "offline" => Ok(Self::Offline),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for PresenceStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PresenceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown status strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown presence status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Per-platform statuses carried by a presence snapshot.
///
/// A platform the user is not connected from is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<PresenceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<PresenceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<PresenceStatus>,
}

impl ClientStatus {
    /// The canonical status for this snapshot. See [`normalize`].
    #[must_use]
    pub const fn canonical(&self) -> Option<PresenceStatus> {
        normalize(self.desktop, self.mobile, self.web)
    }
}

/// Collapses per-platform statuses into one canonical status.
///
/// Priority is positional: desktop, then mobile, then web. An idle desktop
/// therefore masks an online phone. Returns `None` when no platform reported
/// a status.
#[must_use]
pub const fn normalize(
    desktop: Option<PresenceStatus>,
    mobile: Option<PresenceStatus>,
    web: Option<PresenceStatus>,
) -> Option<PresenceStatus> {
    match (desktop, mobile, web) {
        (Some(status), _, _) | (None, Some(status), _) | (None, None, Some(status)) => {
            Some(status)
        }
        (None, None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::status::PresenceStatus::{Dnd, Idle, Offline, Online};

    #[test]
    fn roundtrip_all_variants() {
        for variant in PresenceStatus::ALL {
            let parsed: PresenceStatus = variant.to_string().parse().expect("should parse");
            assert_eq!(parsed, variant, "roundtrip failed for {variant:?}");
        }
    }

    #[test]
    fn unknown_status_errors() {
        let err = "invisible".parse::<PresenceStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown presence status: invisible");
    }

    #[test]
    fn labels_match_display_names() {
        assert_eq!(Dnd.label(), "Do Not Disturb");
        assert_eq!(Online.label(), "Online");
    }

    #[test]
    fn desktop_wins_regardless_of_activity() {
        assert_eq!(normalize(Some(Idle), Some(Online), Some(Online)), Some(Idle));
    }

    #[test]
    fn falls_through_to_mobile_then_web() {
        assert_eq!(normalize(None, Some(Dnd), Some(Online)), Some(Dnd));
        assert_eq!(normalize(None, None, Some(Offline)), Some(Offline));
    }

    #[test]
    fn all_unset_is_absent() {
        assert_eq!(normalize(None, None, None), None);
        assert_eq!(ClientStatus::default().canonical(), None);
    }

    #[test]
    fn client_status_deserializes_partial_payloads() {
        let status: ClientStatus = serde_json::from_str(r#"{"mobile":"idle"}"#).unwrap();
        assert_eq!(
            status,
            ClientStatus {
                desktop: None,
                mobile: Some(Idle),
                web: None,
            }
        );
        assert_eq!(status.canonical(), Some(Idle));
    }
}
