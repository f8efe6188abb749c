//! Storage layer for presence snapshots.
//!
//! Provides an append-only snapshot log using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type keeps its `rusqlite::Connection` behind a `Mutex`, so a
//! single handle can be shared (for example in an `Arc`) between ingestion and
//! query threads. Every append or scan holds the lock for one statement:
//! appends are individually atomic, and callers queue for the connection
//! rather than failing.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with microsecond precision
//! and a `Z` suffix (e.g., `2025-01-15T10:30:00.000000Z`). Sub-microsecond
//! digits are truncated on write. The fixed width means:
//! - Lexicographic ordering matches chronological ordering
//! - Range scans can use the `(user_id, guild_id, timestamp)` index directly
//! - Values stay human-readable in the database
//!
//! ## Status Columns
//!
//! One nullable column per client platform. `NULL` means the platform reported
//! no status. Values are restricted to `online`, `idle`, `dnd` and `offline`.
//!
//! ## Activities
//!
//! The `activities` column holds the serialized activities JSON exactly as it
//! was ingested. It is never parsed here.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use thiserror::Error;

use pt_core::{
    ClientStatus, DayBounds, EventStore, GuildId, PresenceSnapshot, PresenceStatus, ReadError,
    UnknownStatus, UserId, ValidationError, WriteError,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    LockPoisoned,
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for presence update {row_id}: {timestamp}")]
    TimestampParse {
        row_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A status column held a value outside the known set.
    #[error("invalid status for presence update {row_id}")]
    InvalidStatus {
        row_id: i64,
        #[source]
        source: UnknownStatus,
    },
    /// A stored user or guild ID failed validation.
    #[error("invalid identifier for presence update {row_id}")]
    InvalidId {
        row_id: i64,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Snapshot activity for one user in one guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedUser {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub snapshots: i64,
    pub last_seen: DateTime<Utc>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened presence database");
        Self::with_connection(conn)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.lock()?.execute_batch(
            "
            -- Presence updates: one row per observed presence snapshot
            -- timestamp: RFC 3339 UTC with microseconds (e.g., '2025-01-15T10:30:00.000000Z')
            -- client_status_*: NULL when the platform reported nothing
            -- activities: opaque JSON payload
            CREATE TABLE IF NOT EXISTS presence_updates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                client_status_desktop TEXT
                    CHECK (client_status_desktop IN ('online', 'idle', 'dnd', 'offline')),
                client_status_mobile TEXT
                    CHECK (client_status_mobile IN ('online', 'idle', 'dnd', 'offline')),
                client_status_web TEXT
                    CHECK (client_status_web IN ('online', 'idle', 'dnd', 'offline')),
                activities TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_presence_user_guild_time
                ON presence_updates(user_id, guild_id, timestamp);
            ",
        )?;
        Ok(())
    }

    /// Appends one snapshot.
    pub fn append(&self, snapshot: &PresenceSnapshot) -> Result<(), DbError> {
        let conn = self.lock()?;
        insert_snapshot(&conn, snapshot)?;
        tracing::debug!(
            user = %snapshot.user_id,
            guild = %snapshot.guild_id,
            "stored presence snapshot"
        );
        Ok(())
    }

    /// Lists snapshots for a user in a guild within a day.
    ///
    /// The range is inclusive of `day.start()` and exclusive of `day.end()`.
    /// Rows are ordered by timestamp, then insertion order.
    ///
    /// The upper bound is compared as the last stored microsecond of the day,
    /// so the last day of year 9999 never formats a five-digit year.
    pub fn scan(
        &self,
        user: UserId,
        guild: GuildId,
        day: DayBounds,
    ) -> Result<Vec<PresenceSnapshot>, DbError> {
        let start = format_timestamp(day.start());
        let last = format_timestamp(day.end() - Duration::microseconds(1));
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "
            SELECT id, timestamp, user_id, guild_id,
                   client_status_desktop, client_status_mobile, client_status_web, activities
            FROM presence_updates
            WHERE user_id = ? AND guild_id = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![user.get(), guild.get(), start, last],
            SnapshotRow::from_row,
        )?;
        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row?.into_snapshot()?);
        }
        Ok(snapshots)
    }

    /// Lists every (guild, user) pair with its snapshot count, most recently seen first.
    pub fn tracked_users(&self) -> Result<Vec<TrackedUser>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "
            SELECT MAX(id), guild_id, user_id, COUNT(*), MAX(timestamp) AS last_seen
            FROM presence_updates
            GROUP BY guild_id, user_id
            ORDER BY last_seen DESC, guild_id ASC, user_id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut users = Vec::new();
        for row in rows {
            let (row_id, guild_id, user_id, snapshots, last_seen) = row?;
            users.push(TrackedUser {
                guild_id: parse_id(guild_id, row_id)?,
                user_id: parse_id(user_id, row_id)?,
                snapshots,
                last_seen: parse_timestamp(&last_seen, row_id)?,
            });
        }
        Ok(users)
    }
}

impl EventStore for Database {
    fn append(&self, snapshot: &PresenceSnapshot) -> Result<(), WriteError> {
        Self::append(self, snapshot).map_err(WriteError::new)
    }

    fn scan(
        &self,
        user: UserId,
        guild: GuildId,
        day: DayBounds,
    ) -> Result<Vec<PresenceSnapshot>, ReadError> {
        Self::scan(self, user, guild, day).map_err(ReadError::new)
    }
}

fn insert_snapshot(conn: &Connection, snapshot: &PresenceSnapshot) -> Result<(), DbError> {
    let status = &snapshot.client_status;
    let mut stmt = conn.prepare_cached(
        "
        INSERT INTO presence_updates
        (timestamp, user_id, guild_id, client_status_desktop, client_status_mobile, client_status_web, activities)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )?;
    stmt.execute(params![
        format_timestamp(snapshot.timestamp),
        snapshot.user_id.get(),
        snapshot.guild_id.get(),
        status.desktop.map(|s| s.as_str()),
        status.mobile.map(|s| s.as_str()),
        status.web.map(|s| s.as_str()),
        snapshot.activities,
    ])?;
    Ok(())
}

/// A presence row as read from SQLite, before validation.
#[derive(Debug)]
struct SnapshotRow {
    id: i64,
    timestamp: String,
    user_id: i64,
    guild_id: i64,
    desktop: Option<String>,
    mobile: Option<String>,
    web: Option<String>,
    activities: String,
}

impl SnapshotRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            user_id: row.get(2)?,
            guild_id: row.get(3)?,
            desktop: row.get(4)?,
            mobile: row.get(5)?,
            web: row.get(6)?,
            activities: row.get(7)?,
        })
    }

    fn into_snapshot(self) -> Result<PresenceSnapshot, DbError> {
        let client_status = ClientStatus {
            desktop: parse_status(self.desktop.as_deref(), self.id)?,
            mobile: parse_status(self.mobile.as_deref(), self.id)?,
            web: parse_status(self.web.as_deref(), self.id)?,
        };
        Ok(PresenceSnapshot {
            timestamp: parse_timestamp(&self.timestamp, self.id)?,
            user_id: parse_id(self.user_id, self.id)?,
            guild_id: parse_id(self.guild_id, self.id)?,
            client_status,
            activities: self.activities,
        })
    }
}

fn parse_status(value: Option<&str>, row_id: i64) -> Result<Option<PresenceStatus>, DbError> {
    value
        .map(str::parse::<PresenceStatus>)
        .transpose()
        .map_err(|source| DbError::InvalidStatus { row_id, source })
}

fn parse_id<T>(value: i64, row_id: i64) -> Result<T, DbError>
where
    T: TryFrom<i64, Error = ValidationError>,
{
    T::try_from(value).map_err(|source| DbError::InvalidId { row_id, source })
}

fn parse_timestamp(timestamp: &str, row_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use chrono::NaiveDate;
    use pt_core::TimelineService;

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let conn = db.lock().expect("lock connection");

        let columns = table_columns(&conn, "presence_updates");
        assert_eq!(
            columns,
            vec![
                "id",
                "timestamp",
                "user_id",
                "guild_id",
                "client_status_desktop",
                "client_status_mobile",
                "client_status_web",
                "activities",
            ]
        );

        let indexes = index_names(&conn, "presence_updates");
        assert!(indexes.contains("idx_presence_user_guild_time"));
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    fn day() -> DayBounds {
        DayBounds::for_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
    }

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn guild(id: i64) -> GuildId {
        GuildId::new(id).unwrap()
    }

    fn snapshot(timestamp: &str, user_id: i64, desktop: Option<PresenceStatus>) -> PresenceSnapshot {
        PresenceSnapshot::new(
            DateTime::parse_from_rfc3339(timestamp)
                .unwrap()
                .with_timezone(&Utc),
            user(user_id),
            guild(1),
            ClientStatus {
                desktop,
                ..ClientStatus::default()
            },
        )
    }

    fn append_all(db: &Database, rows: &[PresenceSnapshot]) {
        for row in rows {
            db.append(row).expect("append snapshot");
        }
    }

    fn count_rows(db: &Database) -> i64 {
        db.lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM presence_updates", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn append_stores_duplicates_redundantly() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let row = snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Online));

        db.append(&row).unwrap();
        db.append(&row).unwrap();

        assert_eq!(count_rows(&db), 2);
        assert_eq!(db.scan(user(7), guild(1), day()).unwrap(), vec![row.clone(), row]);
    }

    #[test]
    fn scan_returns_rows_in_timestamp_order() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let late = snapshot("2025-01-15T18:00:00Z", 7, Some(PresenceStatus::Idle));
        let early = snapshot("2025-01-15T06:00:00Z", 7, Some(PresenceStatus::Online));
        let absent = snapshot("2025-01-15T12:00:00Z", 7, None);

        append_all(&db, &[late.clone(), early.clone(), absent.clone()]);

        let rows = db.scan(user(7), guild(1), day()).expect("scan");
        assert_eq!(rows, vec![early, absent, late]);
    }

    #[test]
    fn scan_breaks_timestamp_ties_by_insertion_order() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let first = snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Dnd));
        let second = snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Online));

        db.append(&first).unwrap();
        db.append(&second).unwrap();

        let rows = db.scan(user(7), guild(1), day()).unwrap();
        assert_eq!(rows, vec![first, second]);
    }

    #[test]
    fn scan_respects_day_boundaries() {
        let db = Database::open_in_memory().expect("open in-memory db");
        append_all(
            &db,
            &[
                snapshot("2025-01-14T23:59:59.999Z", 7, Some(PresenceStatus::Online)),
                snapshot("2025-01-15T00:00:00Z", 7, Some(PresenceStatus::Idle)),
                snapshot("2025-01-15T23:59:59.999Z", 7, Some(PresenceStatus::Dnd)),
                snapshot("2025-01-16T00:00:00Z", 7, Some(PresenceStatus::Offline)),
            ],
        );

        let rows = db.scan(user(7), guild(1), day()).unwrap();
        let statuses: Vec<_> = rows.iter().map(PresenceSnapshot::status).collect();
        assert_eq!(
            statuses,
            vec![Some(PresenceStatus::Idle), Some(PresenceStatus::Dnd)]
        );
        assert_eq!(rows[0].timestamp, day().start());
        assert_eq!(rows[1].timestamp, day().end() - Duration::milliseconds(1));
    }

    #[test]
    fn sub_millisecond_timestamps_keep_their_order() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let later = snapshot("2025-01-15T09:00:00.000500Z", 7, Some(PresenceStatus::Idle));
        let earlier = snapshot("2025-01-15T09:00:00.000200Z", 7, Some(PresenceStatus::Online));
        append_all(&db, &[later.clone(), earlier.clone()]);

        let rows = db.scan(user(7), guild(1), day()).unwrap();
        assert_eq!(rows, vec![earlier, later]);

        let stored: String = db
            .lock()
            .unwrap()
            .query_row("SELECT timestamp FROM presence_updates WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(stored, "2025-01-15T09:00:00.000500Z");
    }

    #[test]
    fn scan_covers_last_day_of_year_9999() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let last_day = DayBounds::for_date(NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
        let early = snapshot("9999-12-31T00:00:00Z", 7, Some(PresenceStatus::Online));
        let late = snapshot("9999-12-31T23:59:59.999999Z", 7, Some(PresenceStatus::Dnd));
        let before = snapshot("9999-12-30T23:59:59.999999Z", 7, Some(PresenceStatus::Idle));
        append_all(&db, &[early.clone(), late.clone(), before]);

        assert_eq!(db.scan(user(7), guild(1), last_day).unwrap(), vec![early, late]);
    }

    #[test]
    fn scan_filters_by_user_and_guild() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let mine = snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Online));
        let other_user = snapshot("2025-01-15T09:01:00Z", 8, Some(PresenceStatus::Idle));
        let mut other_guild = snapshot("2025-01-15T09:02:00Z", 7, Some(PresenceStatus::Dnd));
        other_guild.guild_id = guild(2);

        append_all(&db, &[mine.clone(), other_user, other_guild]);

        assert_eq!(db.scan(user(7), guild(1), day()).unwrap(), vec![mine]);
    }

    #[test]
    fn round_trips_all_platform_columns_and_activities() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let activities = r#"[{"name":"Visual Studio Code","type":0,"state":"Editing lib.rs"}]"#;
        let row = PresenceSnapshot::new(
            day().start() + Duration::hours(9),
            user(7),
            guild(1),
            ClientStatus {
                desktop: None,
                mobile: Some(PresenceStatus::Idle),
                web: Some(PresenceStatus::Online),
            },
        )
        .with_activities(activities);

        db.append(&row).unwrap();

        let stored = db.scan(user(7), guild(1), day()).unwrap();
        assert_eq!(stored, vec![row]);
        assert_eq!(stored[0].activities, activities);
    }

    #[test]
    fn rejects_unknown_status_values() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let result = db.lock().unwrap().execute(
            "INSERT INTO presence_updates (timestamp, user_id, guild_id, client_status_web)
             VALUES ('2025-01-15T09:00:00.000Z', 7, 1, 'invisible')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn tracked_users_lists_most_recent_first() {
        let db = Database::open_in_memory().expect("open in-memory db");
        append_all(
            &db,
            &[
                snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Online)),
                snapshot("2025-01-15T11:00:00Z", 8, Some(PresenceStatus::Idle)),
                snapshot("2025-01-15T10:00:00Z", 7, None),
            ],
        );

        let users = db.tracked_users().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, user(8));
        assert_eq!(users[0].snapshots, 1);
        assert_eq!(users[1].user_id, user(7));
        assert_eq!(users[1].snapshots, 2);
        assert_eq!(users[1].last_seen, day().start() + Duration::hours(10));
    }

    #[test]
    fn concurrent_appends_are_all_durable() {
        let temp = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&temp.path().join("pt.db")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|worker: i64| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for i in 0..25 {
                        let row = PresenceSnapshot::new(
                            day().start() + Duration::minutes(worker * 25 + i),
                            user(7),
                            guild(1),
                            ClientStatus {
                                desktop: Some(PresenceStatus::Online),
                                ..ClientStatus::default()
                            },
                        );
                        EventStore::append(&db, &row).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let rows = db.scan(user(7), guild(1), day()).unwrap();
        assert_eq!(rows.len(), 200);
        assert!(rows.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn persists_across_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pt.db");
        let row = snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Dnd));
        Database::open(&path).unwrap().append(&row).unwrap();

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.scan(user(7), guild(1), day()).unwrap(), vec![row]);
    }

    #[test]
    fn service_reconstructs_from_database() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let service = TimelineService::new(&db);
        for row in [
            snapshot("2025-01-15T09:00:00Z", 7, Some(PresenceStatus::Online)),
            snapshot("2025-01-15T09:05:00Z", 7, None),
            snapshot("2025-01-15T09:10:00Z", 7, Some(PresenceStatus::Online)),
        ] {
            service.record(&row).unwrap();
        }

        let intervals = service
            .timeline(user(7), guild(1), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
            .unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].end, day().start() + Duration::minutes(9 * 60 + 5));
        assert_eq!(intervals[1].start, day().start() + Duration::minutes(9 * 60 + 10));
        assert_eq!(intervals[1].end, day().end());
    }
}
