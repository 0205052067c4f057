//! Quest management: CRUD, activity-driven progress, and single-shot
//! completion.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{Quest, QuestDifficulty, QuestRequirement, QuestType};
use crate::sensors::DailyActivity;

/// Manager for quests.
pub struct QuestManager<'a> {
    conn: &'a Connection,
}

impl<'a> QuestManager<'a> {
    /// Create a new quest manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new quest.
    pub fn create(&self, quest: &Quest) -> Result<(), QuestError> {
        if quest.requirement.amount == 0 {
            return Err(QuestError::ValidationError(
                "Quest requirement amount must be positive".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO quests
             (id, user_id, title, description, quest_type, difficulty, requirement_json,
              reward_xp, progress, max_progress, completed, expires_at, completed_at,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                quest.id.to_string(),
                quest.user_id.to_string(),
                quest.title,
                quest.description,
                serde_json::to_string(&quest.quest_type)?,
                serde_json::to_string(&quest.difficulty)?,
                serde_json::to_string(&quest.requirement)?,
                quest.reward_xp as i64,
                quest.progress,
                quest.max_progress,
                quest.completed,
                quest.expires_at.map(|t| t.to_rfc3339()),
                Option::<String>::None,
                quest.created_at.to_rfc3339(),
                quest.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get a quest by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<Quest>, QuestError> {
        self.conn
            .query_row(
                "SELECT id, user_id, title, description, quest_type, difficulty,
                        requirement_json, reward_xp, progress, max_progress, completed,
                        expires_at, created_at, updated_at
                 FROM quests WHERE id = ?1",
                params![id.to_string()],
                parse_quest_row,
            )
            .optional()
            .map_err(QuestError::from)
    }

    /// Get a user's open quests.
    pub fn get_active(&self, user_id: Uuid) -> Result<Vec<Quest>, QuestError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, description, quest_type, difficulty,
                    requirement_json, reward_xp, progress, max_progress, completed,
                    expires_at, created_at, updated_at
             FROM quests
             WHERE user_id = ?1 AND completed = 0
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], parse_quest_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(QuestError::from)
    }

    /// Get a user's completed quests.
    pub fn get_completed(&self, user_id: Uuid) -> Result<Vec<Quest>, QuestError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, description, quest_type, difficulty,
                    requirement_json, reward_xp, progress, max_progress, completed,
                    expires_at, created_at, updated_at
             FROM quests
             WHERE user_id = ?1 AND completed = 1
             ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], parse_quest_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(QuestError::from)
    }

    /// Update a quest's progress, clamped at its target.
    pub fn update_progress(&self, id: Uuid, progress: u32) -> Result<(), QuestError> {
        let now = Utc::now();

        let updated = self.conn.execute(
            "UPDATE quests SET progress = MIN(?1, max_progress), updated_at = ?2 WHERE id = ?3",
            params![progress, now.to_rfc3339(), id.to_string()],
        )?;

        if updated == 0 {
            return Err(QuestError::NotFound(id));
        }

        Ok(())
    }

    /// Refresh open quests from a day's activity sample. Returns the
    /// quests whose requirement is now met (still unclaimed).
    pub fn sync_progress_from_activity(
        &self,
        user_id: Uuid,
        activity: &DailyActivity,
    ) -> Result<Vec<Quest>, QuestError> {
        let mut achievable = Vec::new();

        for quest in self.get_active(user_id)? {
            let measured = quest.requirement.kind.measure(activity);
            // Progress never goes backwards on a fluctuating sensor read
            if measured > quest.progress {
                self.update_progress(quest.id, measured)?;
            }
            let progress = measured.max(quest.progress);
            if progress >= quest.max_progress {
                if let Some(refreshed) = self.get(quest.id)? {
                    achievable.push(refreshed);
                }
            }
        }

        Ok(achievable)
    }

    /// Claim a quest's reward. Marks it completed and returns the reward
    /// XP for the caller to run through the progression engine. A second
    /// claim fails, so the reward is granted at most once.
    pub fn complete(&self, id: Uuid) -> Result<u64, QuestError> {
        let quest = self.get(id)?.ok_or(QuestError::NotFound(id))?;

        if quest.completed {
            return Err(QuestError::AlreadyCompleted(id));
        }
        if !quest.is_achievable() {
            return Err(QuestError::ValidationError(format!(
                "Quest requirement not met: {}/{}",
                quest.progress, quest.max_progress
            )));
        }

        let now = Utc::now();
        self.conn.execute(
            "UPDATE quests SET completed = 1, completed_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), id.to_string()],
        )?;

        tracing::info!(quest = %quest.title, reward_xp = quest.reward_xp, "quest completed");

        Ok(quest.reward_xp)
    }

    /// Delete a quest.
    pub fn delete(&self, id: Uuid) -> Result<bool, QuestError> {
        let deleted = self
            .conn
            .execute("DELETE FROM quests WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }
}

/// Parse a database row into a Quest.
fn parse_quest_row(row: &rusqlite::Row) -> rusqlite::Result<Quest> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let quest_type_json: String = row.get(4)?;
    let difficulty_json: String = row.get(5)?;
    let requirement_json: String = row.get(6)?;
    let reward_xp: i64 = row.get(7)?;
    let expires_at_str: Option<String> = row.get(11)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    let quest_type: QuestType =
        serde_json::from_str(&quest_type_json).unwrap_or(QuestType::Daily);
    let difficulty: QuestDifficulty =
        serde_json::from_str(&difficulty_json).unwrap_or(QuestDifficulty::Easy);
    let requirement: QuestRequirement = serde_json::from_str(&requirement_json)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Quest {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        title: row.get(2)?,
        description: row.get(3)?,
        quest_type,
        difficulty,
        requirement,
        reward_xp: reward_xp.max(0) as u64,
        progress: row.get(8)?,
        max_progress: row.get(9)?,
        completed: row.get(10)?,
        expires_at: expires_at_str.and_then(|s| parse_timestamp(&s)),
        created_at: parse_timestamp(&created_at_str).unwrap_or_else(Utc::now),
        updated_at: parse_timestamp(&updated_at_str).unwrap_or_else(Utc::now),
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

/// Quest management errors.
#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Quest not found: {0}")]
    NotFound(Uuid),

    #[error("Quest already completed: {0}")]
    AlreadyCompleted(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::UserAccount;
    use crate::quests::types::RequirementKind;
    use crate::storage::Database;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let user = UserAccount::new("quests@example.com".to_string(), "quester".to_string());
        db.upsert_user(&user).unwrap();
        (db, user.id)
    }

    fn step_quest(user_id: Uuid, target: u32) -> Quest {
        Quest::new(
            user_id,
            format!("Walk {target} steps"),
            QuestType::Daily,
            QuestDifficulty::Medium,
            QuestRequirement::new(RequirementKind::Steps, target),
        )
    }

    #[test]
    fn test_create_and_get_quest() {
        let (db, user_id) = setup();
        let manager = QuestManager::new(db.connection());

        let quest = step_quest(user_id, 5000);
        manager.create(&quest).unwrap();

        let loaded = manager.get(quest.id).unwrap().unwrap();
        assert_eq!(loaded.title, quest.title);
        assert_eq!(loaded.requirement, quest.requirement);
        assert_eq!(loaded.reward_xp, 50);
        assert!(!loaded.completed);
    }

    #[test]
    fn test_zero_requirement_rejected() {
        let (db, user_id) = setup();
        let manager = QuestManager::new(db.connection());

        let result = manager.create(&step_quest(user_id, 0));
        assert!(matches!(result, Err(QuestError::ValidationError(_))));
    }

    #[test]
    fn test_progress_clamped_in_store() {
        let (db, user_id) = setup();
        let manager = QuestManager::new(db.connection());

        let quest = step_quest(user_id, 5000);
        manager.create(&quest).unwrap();
        manager.update_progress(quest.id, 99999).unwrap();

        let loaded = manager.get(quest.id).unwrap().unwrap();
        assert_eq!(loaded.progress, 5000);
    }

    #[test]
    fn test_sync_progress_from_activity() {
        let (db, user_id) = setup();
        let manager = QuestManager::new(db.connection());

        let reachable = step_quest(user_id, 3000);
        let distant = step_quest(user_id, 20000);
        manager.create(&reachable).unwrap();
        manager.create(&distant).unwrap();

        let activity = DailyActivity::from_steps(4200, "2025-06-01".parse().unwrap());
        let achievable = manager.sync_progress_from_activity(user_id, &activity).unwrap();

        assert_eq!(achievable.len(), 1);
        assert_eq!(achievable[0].id, reachable.id);
        assert_eq!(manager.get(distant.id).unwrap().unwrap().progress, 4200);

        // A regressed read never lowers progress
        let regressed = DailyActivity::from_steps(1000, "2025-06-01".parse().unwrap());
        manager.sync_progress_from_activity(user_id, &regressed).unwrap();
        assert_eq!(manager.get(distant.id).unwrap().unwrap().progress, 4200);
    }

    #[test]
    fn test_complete_grants_reward_exactly_once() {
        let (db, user_id) = setup();
        let manager = QuestManager::new(db.connection());

        let quest = step_quest(user_id, 3000);
        manager.create(&quest).unwrap();
        manager.update_progress(quest.id, 3000).unwrap();

        let reward = manager.complete(quest.id).unwrap();
        assert_eq!(reward, 50);

        let again = manager.complete(quest.id);
        assert!(matches!(again, Err(QuestError::AlreadyCompleted(_))));

        assert_eq!(manager.get_active(user_id).unwrap().len(), 0);
        assert_eq!(manager.get_completed(user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_complete_requires_target_met() {
        let (db, user_id) = setup();
        let manager = QuestManager::new(db.connection());

        let quest = step_quest(user_id, 3000);
        manager.create(&quest).unwrap();
        manager.update_progress(quest.id, 1500).unwrap();

        let result = manager.complete(quest.id);
        assert!(matches!(result, Err(QuestError::ValidationError(_))));
    }
}
