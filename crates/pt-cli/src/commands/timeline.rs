//! Timeline command for showing a day of status intervals.
//!
//! This module implements `pt timeline`, which rebuilds the status timeline
//! of one or more users in a guild for a UTC day and prints it as text or JSON.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use rayon::prelude::*;

use pt_core::{
    DayBounds, EventStore, GuildId, StatusInterval, TimelineService, UserId, summarize,
};

use super::util::{format_duration, parse_day};

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Guild to query. Defaults to `guild_id` from config.
    #[arg(long)]
    pub guild: Option<GuildId>,

    /// User to query. Repeat to query several users at once.
    #[arg(long = "user", required = true)]
    pub users: Vec<UserId>,

    /// Day to show: YYYY-MM-DD, "today", "yesterday" or "N days ago" (UTC).
    #[arg(long)]
    pub date: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One user's reconstructed day.
#[derive(Debug, Clone)]
pub struct UserTimeline {
    pub user: UserId,
    pub intervals: Vec<StatusInterval>,
}

/// Resolves the query and renders it.
pub fn run<S: EventStore>(
    service: &TimelineService<S>,
    args: &TimelineArgs,
    default_guild: Option<GuildId>,
    today: NaiveDate,
) -> Result<String> {
    let guild = args
        .guild
        .or(default_guild)
        .context("no guild given: pass --guild or set guild_id in config")?;
    let date = match args.date.as_deref() {
        Some(day) => parse_day(day, today)?,
        None => today,
    };

    let timelines = fetch_timelines(service, guild, &args.users, date)?;

    if args.json {
        render_json(&timelines)
    } else {
        Ok(render_text(guild, date, &timelines))
    }
}

/// Runs one query per user in parallel; results keep the order of `users`.
pub fn fetch_timelines<S: EventStore>(
    service: &TimelineService<S>,
    guild: GuildId,
    users: &[UserId],
    date: NaiveDate,
) -> Result<Vec<UserTimeline>> {
    users
        .par_iter()
        .map(|&user| {
            let intervals = service
                .timeline(user, guild, date)
                .with_context(|| format!("failed to load timeline for user {user}"))?;
            Ok(UserTimeline { user, intervals })
        })
        .collect()
}

/// One user renders as a bare array; several users as an object keyed by user ID.
fn render_json(timelines: &[UserTimeline]) -> Result<String> {
    let json = if let [single] = timelines {
        serde_json::to_string_pretty(&single.intervals)?
    } else {
        let by_user: BTreeMap<String, &[StatusInterval]> = timelines
            .iter()
            .map(|timeline| (timeline.user.to_string(), timeline.intervals.as_slice()))
            .collect();
        serde_json::to_string_pretty(&by_user)?
    };
    Ok(json)
}

/// Renders timelines as human-readable text.
pub fn render_text(guild: GuildId, date: NaiveDate, timelines: &[UserTimeline]) -> String {
    let day = DayBounds::for_date(date);
    let mut out = String::new();

    for (idx, timeline) in timelines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "Timeline for user {} in guild {guild} on {date} (UTC)",
            timeline.user
        );

        if timeline.intervals.is_empty() {
            let _ = writeln!(out, "  No status data for this day.");
            continue;
        }

        for interval in &timeline.intervals {
            let _ = writeln!(
                out,
                "  {}-{}  {:<14}  {}",
                format_clock(interval.start, day),
                format_clock(interval.end, day),
                interval.status.label(),
                format_duration(interval.duration().to_std().unwrap_or_default()),
            );
        }

        let summary = summarize(&timeline.intervals);
        let _ = writeln!(out, "Tracked: {}", format_duration(summary.tracked));
        for (status, total) in &summary.by_status {
            let _ = writeln!(out, "  {:<14}  {}", status.label(), format_duration(*total));
        }
    }

    out
}

/// Wall-clock time within the day; the end of the day prints as 24:00:00.
fn format_clock(timestamp: DateTime<Utc>, day: DayBounds) -> String {
    if timestamp == day.end() {
        "24:00:00".to_string()
    } else {
        timestamp.format("%H:%M:%S").to_string()
    }
}
