//! Ingest command for recording presence events.
//!
//! Reads one gateway presence event per line from stdin and appends each to
//! the snapshot store as soon as it is parsed, so the command can sit at the
//! end of a live pipe.

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Deserialize;
use serde_json::value::RawValue;

use pt_core::snapshot::EMPTY_ACTIVITIES;
use pt_core::{
    ClientStatus, EventStore, GuildId, PresenceSnapshot, PresenceStatus, TimelineService, UserId,
    is_supported,
};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Only record events for this guild. Overrides `guild_id` from config.
    #[arg(long)]
    pub guild: Option<GuildId>,
}

/// Outcome of an ingest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub recorded: usize,
    pub skipped: usize,
}

/// Records every event from `reader`.
///
/// Events for guilds other than `tracked_guild` are skipped. Each snapshot is
/// durable before the next line is read; a malformed line stops the run with
/// its line number.
pub fn run<S, R>(
    service: &TimelineService<S>,
    reader: R,
    tracked_guild: Option<GuildId>,
) -> Result<IngestSummary>
where
    S: EventStore,
    R: std::io::BufRead,
{
    let mut summary = IngestSummary::default();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let snapshot = parse_event(trimmed, Utc::now())
            .with_context(|| format!("invalid event on line {line_no}"))?;

        if tracked_guild.is_some_and(|guild| guild != snapshot.guild_id) {
            tracing::debug!(guild = %snapshot.guild_id, line = line_no, "skipping untracked guild");
            summary.skipped += 1;
            continue;
        }

        service
            .record(&snapshot)
            .with_context(|| format!("failed to record event on line {line_no}"))?;
        summary.recorded += 1;
    }

    tracing::info!(
        recorded = summary.recorded,
        skipped = summary.skipped,
        "ingest finished"
    );
    Ok(summary)
}

/// A presence event as delivered by the gateway collaborator.
#[derive(Debug, Deserialize)]
struct GatewayPresence {
    /// Observation time. Defaults to the time of ingestion.
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    user_id: Snowflake,
    guild_id: Snowflake,
    #[serde(default)]
    client_status: GatewayClientStatus,
    #[serde(default)]
    activities: Option<Box<RawValue>>,
}

/// Snowflakes arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Snowflake {
    Number(i64),
    Text(String),
}

impl Snowflake {
    fn parse<T>(&self) -> Result<T>
    where
        T: TryFrom<i64, Error = pt_core::ValidationError>
            + std::str::FromStr<Err = pt_core::ValidationError>,
    {
        let id = match self {
            Self::Number(id) => T::try_from(*id)?,
            Self::Text(id) => id.parse()?,
        };
        Ok(id)
    }
}

/// Per-platform statuses. The gateway reports unset platforms as empty strings.
#[derive(Debug, Default, Deserialize)]
struct GatewayClientStatus {
    #[serde(default)]
    desktop: Option<String>,
    #[serde(default)]
    mobile: Option<String>,
    #[serde(default)]
    web: Option<String>,
}

impl GatewayClientStatus {
    fn into_client_status(self) -> Result<ClientStatus> {
        Ok(ClientStatus {
            desktop: parse_platform(self.desktop, "desktop")?,
            mobile: parse_platform(self.mobile, "mobile")?,
            web: parse_platform(self.web, "web")?,
        })
    }
}

fn parse_platform(value: Option<String>, platform: &str) -> Result<Option<PresenceStatus>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(status) => status
            .parse::<PresenceStatus>()
            .map(Some)
            .with_context(|| format!("invalid {platform} status")),
    }
}

fn parse_event(line: &str, now: DateTime<Utc>) -> Result<PresenceSnapshot> {
    let event: GatewayPresence = serde_json::from_str(line).context("invalid JSON")?;
    let user_id: UserId = event.user_id.parse()?;
    let guild_id: GuildId = event.guild_id.parse()?;
    let timestamp = event.timestamp.unwrap_or(now);
    ensure!(
        is_supported(timestamp.date_naive()),
        "timestamp {timestamp} is outside years 0000-9999"
    );
    let activities = event
        .activities
        .map_or_else(|| EMPTY_ACTIVITIES.to_string(), |raw| raw.get().to_string());

    Ok(PresenceSnapshot {
        timestamp,
        user_id,
        guild_id,
        client_status: event.client_status.into_client_status()?,
        activities,
    })
}
