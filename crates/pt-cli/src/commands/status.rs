//! Status command for showing tracked users.

use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;

use pt_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let users = db.tracked_users()?;

    writeln!(writer, "Presence tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    if let Some(guild) = config.guild_id {
        writeln!(writer, "Tracked guild: {guild}")?;
    }

    if users.is_empty() {
        writeln!(writer, "No presence snapshots recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Users:")?;
    for user in users {
        writeln!(
            writer,
            "- guild {} user {}: {} snapshots, last seen {}",
            user.guild_id,
            user.user_id,
            user.snapshots,
            user.last_seen.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
    }

    Ok(())
}
