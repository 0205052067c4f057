//! Quest type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sensors::DailyActivity;

/// A quest assigned to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    /// Unique identifier
    pub id: Uuid,
    /// User who owns this quest
    pub user_id: Uuid,
    /// Display title
    pub title: String,
    /// Optional detailed description
    pub description: Option<String>,
    /// Cadence of the quest
    pub quest_type: QuestType,
    /// Difficulty tier
    pub difficulty: QuestDifficulty,
    /// What must be achieved
    pub requirement: QuestRequirement,
    /// Experience granted on completion
    pub reward_xp: u64,
    /// Current progress toward the requirement
    pub progress: u32,
    /// Progress at which the quest is achievable
    pub max_progress: u32,
    /// Whether the reward has been claimed
    pub completed: bool,
    /// Optional expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// When the quest was created
    pub created_at: DateTime<Utc>,
    /// When the quest was last updated
    pub updated_at: DateTime<Utc>,
}

impl Quest {
    /// Create a new quest. The requirement amount doubles as the
    /// progress target; the reward defaults to the difficulty's suggested
    /// XP.
    pub fn new(
        user_id: Uuid,
        title: String,
        quest_type: QuestType,
        difficulty: QuestDifficulty,
        requirement: QuestRequirement,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description: None,
            quest_type,
            difficulty,
            reward_xp: difficulty.suggested_reward_xp(),
            progress: 0,
            max_progress: requirement.amount,
            requirement,
            completed: false,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record progress, clamped at the target. Returns true once the
    /// target is reached.
    pub fn set_progress(&mut self, progress: u32) -> bool {
        self.progress = progress.min(self.max_progress);
        self.updated_at = Utc::now();
        self.is_achievable()
    }

    /// Whether the requirement has been met.
    pub fn is_achievable(&self) -> bool {
        self.progress >= self.max_progress
    }

    /// Whether the quest has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }

    /// Fraction of the requirement met, for progress bars.
    pub fn progress_fraction(&self) -> f32 {
        if self.max_progress == 0 {
            return 1.0;
        }
        self.progress as f32 / self.max_progress as f32
    }
}

/// Cadence of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestType {
    /// Resets every day
    Daily,
    /// Resets every week
    Weekly,
    /// Resets every month
    Monthly,
    /// One-off event quest
    Special,
    /// Part of the story line
    Story,
}

impl QuestType {
    /// Get display name for the quest type.
    pub fn display_name(&self) -> &'static str {
        match self {
            QuestType::Daily => "Daily",
            QuestType::Weekly => "Weekly",
            QuestType::Monthly => "Monthly",
            QuestType::Special => "Special",
            QuestType::Story => "Story",
        }
    }
}

impl std::fmt::Display for QuestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Difficulty tier of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestDifficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl QuestDifficulty {
    /// Get display name for the difficulty.
    pub fn display_name(&self) -> &'static str {
        match self {
            QuestDifficulty::Easy => "Easy",
            QuestDifficulty::Medium => "Medium",
            QuestDifficulty::Hard => "Hard",
            QuestDifficulty::Extreme => "Extreme",
        }
    }

    /// Default XP reward for this tier.
    pub fn suggested_reward_xp(&self) -> u64 {
        match self {
            QuestDifficulty::Easy => 25,
            QuestDifficulty::Medium => 50,
            QuestDifficulty::Hard => 100,
            QuestDifficulty::Extreme => 250,
        }
    }
}

impl std::fmt::Display for QuestDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The activity counter a quest tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Steps,
    Calories,
    ActiveMinutes,
}

impl RequirementKind {
    /// Read the tracked counter out of a day's activity.
    pub fn measure(&self, activity: &DailyActivity) -> u32 {
        match self {
            RequirementKind::Steps => activity.steps,
            RequirementKind::Calories => activity.calories,
            RequirementKind::ActiveMinutes => activity.active_minutes,
        }
    }
}

/// What a quest requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestRequirement {
    /// Tracked counter
    pub kind: RequirementKind,
    /// Amount that must be reached
    pub amount: u32,
}

impl QuestRequirement {
    /// Create a new requirement.
    pub fn new(kind: RequirementKind, amount: u32) -> Self {
        Self { kind, amount }
    }
}
