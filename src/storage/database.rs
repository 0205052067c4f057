//! Database operations using rusqlite.
//!
//! Plays the role of the remote document store the mobile client talked
//! to: character progress, users, the daily XP ledger, activity history,
//! and quests all live here.

use crate::character::{Character, CharacterStats, SportCategory, UserAccount};
use crate::progression::{DailyXpEntry, PersistRecord};
use crate::sensors::DailyActivity;
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &PathBuf) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            // Initial schema
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        // Future migrations would go here:
        // if from_version < 2 { ... }

        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== User operations ==========

    /// Insert or replace a user record.
    pub fn upsert_user(&self, user: &UserAccount) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO users (id, email, username, created_at, last_login_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email, username = excluded.username,
                 last_login_at = excluded.last_login_at",
                params![
                    user.id.to_string(),
                    user.email,
                    user.username,
                    user.created_at.to_rfc3339(),
                    user.last_login_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: Uuid) -> Result<Option<UserAccount>, DatabaseError> {
        self.find_user("SELECT id, email, username, created_at, last_login_at FROM users WHERE id = ?1", &id.to_string())
    }

    /// Get a user by email.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DatabaseError> {
        self.find_user("SELECT id, email, username, created_at, last_login_at FROM users WHERE email = ?1", email)
    }

    fn find_user(&self, sql: &str, key: &str) -> Result<Option<UserAccount>, DatabaseError> {
        let result = self.conn.query_row(sql, params![key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                username: row.get(2)?,
                created_at: row.get(3)?,
                last_login_at: row.get(4)?,
            })
        });

        match result {
            Ok(row) => Ok(Some(row.into_user())),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    // ========== Character operations ==========

    /// Insert a newly created character.
    pub fn insert_character(&self, character: &Character) -> Result<(), DatabaseError> {
        let stats_json = serde_json::to_string(&character.stats)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO characters (id, user_id, name, level, experience,
                 experience_to_next, sport_category, stats_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    character.id.to_string(),
                    character.user_id.to_string(),
                    character.name,
                    character.level,
                    character.experience as i64,
                    character.experience_to_next as i64,
                    character.sport_category.as_str(),
                    stats_json,
                    character.created_at.to_rfc3339(),
                    character.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get the character owned by a user.
    pub fn get_character_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Character>, DatabaseError> {
        let result = self.conn.query_row(
            "SELECT id, user_id, name, level, experience, experience_to_next,
             sport_category, stats_json, created_at, updated_at
             FROM characters WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| {
                Ok(CharacterRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    level: row.get(3)?,
                    experience: row.get(4)?,
                    experience_to_next: row.get(5)?,
                    sport_category: row.get(6)?,
                    stats_json: row.get(7)?,
                    created_at: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            },
        );

        match result {
            Ok(row) => Ok(Some(row.into_character()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Update a full character record.
    pub fn update_character(&self, character: &Character) -> Result<(), DatabaseError> {
        let stats_json = serde_json::to_string(&character.stats)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "UPDATE characters SET
                 name = ?1, level = ?2, experience = ?3, experience_to_next = ?4,
                 sport_category = ?5, stats_json = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    character.name,
                    character.level,
                    character.experience as i64,
                    character.experience_to_next as i64,
                    character.sport_category.as_str(),
                    stats_json,
                    Utc::now().to_rfc3339(),
                    character.id.to_string(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Patch the `{experience, level}` progress pair for a user's
    /// character. This is the write the engine requests after every
    /// transition.
    pub fn update_character_progress(
        &self,
        user_id: Uuid,
        experience: u64,
        level: u32,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .conn
            .execute(
                "UPDATE characters SET experience = ?1, level = ?2, updated_at = ?3
                 WHERE user_id = ?4",
                params![
                    experience as i64,
                    level,
                    Utc::now().to_rfc3339(),
                    user_id.to_string(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if updated == 0 {
            return Err(DatabaseError::NotFound(format!(
                "no character for user {user_id}"
            )));
        }

        Ok(())
    }

    // ========== Daily XP ledger operations ==========

    /// Get the ledger entry for a user and day.
    pub fn get_ledger_entry(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyXpEntry>, DatabaseError> {
        let result = self.conn.query_row(
            "SELECT cumulative_xp FROM xp_ledger WHERE user_id = ?1 AND date = ?2",
            params![user_id.to_string(), date.to_string()],
            |row| row.get::<_, i64>(0),
        );

        match result {
            Ok(cumulative_xp) => Ok(Some(DailyXpEntry {
                user_id,
                date,
                cumulative_xp: cumulative_xp.max(0) as u64,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Insert or supersede the ledger entry for a user and day.
    pub fn upsert_ledger_entry(&self, entry: &DailyXpEntry) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO xp_ledger (user_id, date, cumulative_xp, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                 cumulative_xp = excluded.cumulative_xp, updated_at = excluded.updated_at",
                params![
                    entry.user_id.to_string(),
                    entry.date.to_string(),
                    entry.cumulative_xp as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    // ========== Activity history operations ==========

    /// Insert or replace a day's activity counters.
    pub fn upsert_daily_activity(
        &self,
        user_id: Uuid,
        activity: &DailyActivity,
    ) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO daily_activity
                 (user_id, date, steps, calories, active_minutes, distance_meters, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                 steps = excluded.steps, calories = excluded.calories,
                 active_minutes = excluded.active_minutes,
                 distance_meters = excluded.distance_meters,
                 synced_at = excluded.synced_at",
                params![
                    user_id.to_string(),
                    activity.date.to_string(),
                    activity.steps,
                    activity.calories,
                    activity.active_minutes,
                    activity.distance_meters,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Get a user's activity history, most recent day first.
    pub fn activity_history(
        &self,
        user_id: Uuid,
        days: u32,
    ) -> Result<Vec<DailyActivity>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT date, steps, calories, active_minutes, distance_meters
                 FROM daily_activity WHERE user_id = ?1
                 ORDER BY date DESC LIMIT ?2",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id.to_string(), days], |row| {
                let date_str: String = row.get(0)?;
                Ok(DailyActivity {
                    date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                        .unwrap_or_default(),
                    steps: row.get(1)?,
                    calories: row.get(2)?,
                    active_minutes: row.get(3)?,
                    distance_meters: row.get(4)?,
                })
            })
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    // ========== Leaderboard ==========

    /// Top characters by progression, optionally within one sport
    /// category.
    pub fn leaderboard(
        &self,
        category: Option<SportCategory>,
        limit: usize,
    ) -> Result<Vec<LeaderboardRow>, DatabaseError> {
        let sql = match category {
            Some(_) => {
                "SELECT c.name, u.username, c.level, c.experience, c.sport_category
                 FROM characters c JOIN users u ON u.id = c.user_id
                 WHERE c.sport_category = ?1
                 ORDER BY c.level DESC, c.experience DESC LIMIT ?2"
            }
            None => {
                "SELECT c.name, u.username, c.level, c.experience, c.sport_category
                 FROM characters c JOIN users u ON u.id = c.user_id
                 ORDER BY c.level DESC, c.experience DESC LIMIT ?1"
            }
        };

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let map_row = |row: &rusqlite::Row| {
            let category_str: String = row.get(4)?;
            Ok(LeaderboardRow {
                character_name: row.get(0)?,
                username: row.get(1)?,
                level: row.get(2)?,
                experience: row.get::<_, i64>(3)?.max(0) as u64,
                sport_category: SportCategory::parse(&category_str)
                    .unwrap_or(SportCategory::Runner),
            })
        };

        let rows = match category {
            Some(c) => stmt.query_map(params![c.as_str(), limit as i64], map_row),
            None => stmt.query_map(params![limit as i64], map_row),
        }
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    // ========== Persistence dispatch ==========

    /// Apply a write requested by the progression engine.
    pub fn apply(&self, record: &PersistRecord) -> Result<(), DatabaseError> {
        match record {
            PersistRecord::CharacterProgress {
                user_id,
                experience,
                level,
            } => self.update_character_progress(*user_id, *experience, *level),
            PersistRecord::DailyLedger {
                user_id,
                date,
                cumulative_xp,
            } => self.upsert_ledger_entry(&DailyXpEntry {
                user_id: *user_id,
                date: *date,
                cumulative_xp: *cumulative_xp,
            }),
            PersistRecord::Activity { user_id, activity } => {
                self.upsert_daily_activity(*user_id, activity)
            }
        }
    }
}

/// One leaderboard entry.
#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub character_name: String,
    pub username: String,
    pub level: u32,
    pub experience: u64,
    pub sport_category: SportCategory,
}

/// Raw user row, converted after fetching.
struct UserRow {
    id: String,
    email: String,
    username: String,
    created_at: String,
    last_login_at: String,
}

impl UserRow {
    fn into_user(self) -> UserAccount {
        UserAccount {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            email: self.email,
            username: self.username,
            created_at: parse_timestamp(&self.created_at),
            last_login_at: parse_timestamp(&self.last_login_at),
        }
    }
}

/// Raw character row, converted after fetching.
struct CharacterRow {
    id: String,
    user_id: String,
    name: String,
    level: u32,
    experience: i64,
    experience_to_next: i64,
    sport_category: String,
    stats_json: String,
    created_at: String,
    updated_at: String,
}

impl CharacterRow {
    fn into_character(self) -> Result<Character, DatabaseError> {
        let stats: CharacterStats = serde_json::from_str(&self.stats_json)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let sport_category = SportCategory::parse(&self.sport_category).ok_or_else(|| {
            DatabaseError::SerializationError(format!(
                "unknown sport category '{}'",
                self.sport_category
            ))
        })?;

        Ok(Character {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            name: self.name,
            level: self.level,
            experience: self.experience.max(0) as u64,
            experience_to_next: self.experience_to_next.max(1) as u64,
            sport_category,
            stats,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, UserAccount) {
        let db = Database::open_in_memory().unwrap();
        let user = UserAccount::new("lena@example.com".to_string(), "lena".to_string());
        db.upsert_user(&user).unwrap();
        (db, user)
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_user_round_trip() {
        let (db, user) = setup();

        let by_id = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(by_id.email, "lena@example.com");

        let by_email = db.get_user_by_email("lena@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_character_round_trip() {
        let (db, user) = setup();
        let character = Character::new(user.id, "Lena".to_string(), SportCategory::Swimmer);
        db.insert_character(&character).unwrap();

        let loaded = db.get_character_by_user(user.id).unwrap().unwrap();
        assert_eq!(loaded.id, character.id);
        assert_eq!(loaded.name, "Lena");
        assert_eq!(loaded.sport_category, SportCategory::Swimmer);
        assert_eq!(loaded.stats, character.stats);
        assert_eq!(loaded.experience_to_next, character.experience_to_next);
    }

    #[test]
    fn test_progress_patch() {
        let (db, user) = setup();
        let character = Character::new(user.id, "Lena".to_string(), SportCategory::Gym);
        db.insert_character(&character).unwrap();

        db.update_character_progress(user.id, 42, 3).unwrap();

        let loaded = db.get_character_by_user(user.id).unwrap().unwrap();
        assert_eq!(loaded.experience, 42);
        assert_eq!(loaded.level, 3);
        // Full stats are untouched by the patch
        assert_eq!(loaded.stats, character.stats);
    }

    #[test]
    fn test_progress_patch_without_character_fails() {
        let (db, user) = setup();
        let result = db.update_character_progress(user.id, 10, 1);
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }

    #[test]
    fn test_ledger_upsert_supersedes() {
        let (db, user) = setup();
        let date = day("2025-06-01");

        assert!(db.get_ledger_entry(user.id, date).unwrap().is_none());

        db.upsert_ledger_entry(&DailyXpEntry {
            user_id: user.id,
            date,
            cumulative_xp: 25,
        })
        .unwrap();
        db.upsert_ledger_entry(&DailyXpEntry {
            user_id: user.id,
            date,
            cumulative_xp: 40,
        })
        .unwrap();

        let entry = db.get_ledger_entry(user.id, date).unwrap().unwrap();
        assert_eq!(entry.cumulative_xp, 40);

        // Another day is a separate entry
        assert!(db
            .get_ledger_entry(user.id, day("2025-06-02"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_activity_history_ordering() {
        let (db, user) = setup();

        for (d, steps) in [("2025-06-01", 1000), ("2025-06-03", 3000), ("2025-06-02", 2000)] {
            db.upsert_daily_activity(user.id, &DailyActivity::from_steps(steps, day(d)))
                .unwrap();
        }

        let history = db.activity_history(user.id, 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, day("2025-06-03"));
        assert_eq!(history[1].date, day("2025-06-02"));
    }

    #[test]
    fn test_leaderboard_ordering_and_filter() {
        let db = Database::open_in_memory().unwrap();

        for (name, category, level, exp) in [
            ("Ada", SportCategory::Runner, 5u32, 10u64),
            ("Ben", SportCategory::Gym, 5, 90),
            ("Cleo", SportCategory::Runner, 2, 300),
        ] {
            let user = UserAccount::new(format!("{name}@example.com"), name.to_lowercase());
            db.upsert_user(&user).unwrap();
            let mut character = Character::new(user.id, name.to_string(), category);
            character.level = level;
            character.experience = exp;
            db.insert_character(&character).unwrap();
        }

        let all = db.leaderboard(None, 10).unwrap();
        let names: Vec<_> = all.iter().map(|r| r.character_name.as_str()).collect();
        assert_eq!(names, ["Ben", "Ada", "Cleo"]);

        let runners = db.leaderboard(Some(SportCategory::Runner), 10).unwrap();
        let names: Vec<_> = runners.iter().map(|r| r.character_name.as_str()).collect();
        assert_eq!(names, ["Ada", "Cleo"]);
    }

    #[test]
    fn test_apply_persist_records() {
        let (db, user) = setup();
        let character = Character::new(user.id, "Lena".to_string(), SportCategory::Tennis);
        db.insert_character(&character).unwrap();
        let date = day("2025-06-01");

        db.apply(&PersistRecord::CharacterProgress {
            user_id: user.id,
            experience: 25,
            level: 3,
        })
        .unwrap();
        db.apply(&PersistRecord::DailyLedger {
            user_id: user.id,
            date,
            cumulative_xp: 250,
        })
        .unwrap();
        db.apply(&PersistRecord::Activity {
            user_id: user.id,
            activity: DailyActivity::from_steps(4000, date),
        })
        .unwrap();

        assert_eq!(db.get_character_by_user(user.id).unwrap().unwrap().level, 3);
        assert_eq!(
            db.get_ledger_entry(user.id, date).unwrap().unwrap().cumulative_xp,
            250
        );
        assert_eq!(db.activity_history(user.id, 7).unwrap().len(), 1);
    }
}
