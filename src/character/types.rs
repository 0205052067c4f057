//! Character, stat, and sport category type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Experience required for the first level-up.
pub const STARTING_THRESHOLD: u64 = 100;

/// An authenticated account, as handed over by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    /// Opaque identifier from the identity provider
    pub id: Uuid,
    /// Sign-in email
    pub email: String,
    /// Display name
    pub username: String,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last sign-in timestamp
    pub last_login_at: DateTime<Utc>,
}

impl UserAccount {
    /// Create a new account record.
    pub fn new(email: String, username: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            created_at: now,
            last_login_at: now,
        }
    }
}

/// Attribute block carried by every character.
///
/// Invariant: `health <= max_health` and `mana <= max_mana` after any
/// mutation; callers mutating maxima go through [`CharacterStats::clamp_pools`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub strength: u32,
    pub agility: u32,
    pub endurance: u32,
    pub intelligence: u32,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self::base()
    }
}

impl CharacterStats {
    /// Stats every character starts from, before category bonuses.
    pub fn base() -> Self {
        Self {
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            strength: 10,
            agility: 10,
            endurance: 10,
            intelligence: 10,
        }
    }

    /// Re-establish `health <= max_health` and `mana <= max_mana`.
    pub fn clamp_pools(&mut self) {
        if self.health > self.max_health {
            self.health = self.max_health;
        }
        if self.mana > self.max_mana {
            self.mana = self.max_mana;
        }
    }
}

/// Creation-time stat bonuses granted by a sport category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatBonuses {
    pub strength: u32,
    pub agility: u32,
    pub endurance: u32,
    pub intelligence: u32,
}

/// Real-world sport a character is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportCategory {
    Basketball,
    Soccer,
    Runner,
    Cyclist,
    Swimmer,
    Tennis,
    Gym,
    Yoga,
}

impl SportCategory {
    /// All selectable categories, in presentation order.
    pub const ALL: [SportCategory; 8] = [
        SportCategory::Basketball,
        SportCategory::Soccer,
        SportCategory::Runner,
        SportCategory::Cyclist,
        SportCategory::Swimmer,
        SportCategory::Tennis,
        SportCategory::Gym,
        SportCategory::Yoga,
    ];

    /// Get display name for the category.
    pub fn display_name(&self) -> &'static str {
        match self {
            SportCategory::Basketball => "Basketball",
            SportCategory::Soccer => "Soccer",
            SportCategory::Runner => "Runner",
            SportCategory::Cyclist => "Cyclist",
            SportCategory::Swimmer => "Swimmer",
            SportCategory::Tennis => "Tennis",
            SportCategory::Gym => "Gym",
            SportCategory::Yoga => "Yoga",
        }
    }

    /// Get description of the training style behind the category.
    pub fn description(&self) -> &'static str {
        match self {
            SportCategory::Basketball => "Agility and explosiveness for court sports",
            SportCategory::Soccer => "Stamina and coordination, built for cardio",
            SportCategory::Runner => "Endurance specialist for long distances",
            SportCategory::Cyclist => "Leg power and sustained effort",
            SportCategory::Swimmer => "Full-body athlete with balanced training",
            SportCategory::Tennis => "Speed and precision for reactive movement",
            SportCategory::Gym => "Maximum strength and muscle mass",
            SportCategory::Yoga => "Flexibility and mental focus",
        }
    }

    /// Stat bonuses applied once, at character creation.
    pub fn bonus_stats(&self) -> StatBonuses {
        match self {
            SportCategory::Basketball => StatBonuses {
                agility: 4,
                strength: 3,
                endurance: 3,
                ..Default::default()
            },
            SportCategory::Soccer => StatBonuses {
                endurance: 5,
                agility: 3,
                strength: 2,
                ..Default::default()
            },
            SportCategory::Runner => StatBonuses {
                endurance: 6,
                agility: 2,
                intelligence: 2,
                ..Default::default()
            },
            SportCategory::Cyclist => StatBonuses {
                endurance: 4,
                strength: 4,
                intelligence: 2,
                ..Default::default()
            },
            SportCategory::Swimmer => StatBonuses {
                strength: 3,
                endurance: 4,
                agility: 3,
                ..Default::default()
            },
            SportCategory::Tennis => StatBonuses {
                agility: 5,
                intelligence: 3,
                strength: 2,
                ..Default::default()
            },
            SportCategory::Gym => StatBonuses {
                strength: 6,
                endurance: 2,
                intelligence: 2,
                ..Default::default()
            },
            SportCategory::Yoga => StatBonuses {
                intelligence: 5,
                agility: 3,
                endurance: 2,
                ..Default::default()
            },
        }
    }

    /// Stable lowercase identifier used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SportCategory::Basketball => "basketball",
            SportCategory::Soccer => "soccer",
            SportCategory::Runner => "runner",
            SportCategory::Cyclist => "cyclist",
            SportCategory::Swimmer => "swimmer",
            SportCategory::Tennis => "tennis",
            SportCategory::Gym => "gym",
            SportCategory::Yoga => "yoga",
        }
    }

    /// Parse the storage identifier back into a category.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for SportCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A player's game persona. One per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Character name chosen by the player
    pub name: String,
    /// Current level, starts at 1
    pub level: u32,
    /// Progress toward the next level
    pub experience: u64,
    /// Experience threshold for the next level-up
    pub experience_to_next: u64,
    /// Sport category chosen at creation
    pub sport_category: SportCategory,
    /// Current attribute block
    pub stats: CharacterStats,
    /// When the character was created
    pub created_at: DateTime<Utc>,
    /// When the character last changed
    pub updated_at: DateTime<Utc>,
}

impl Character {
    /// Create a level-1 character with category bonuses baked into the
    /// base stats.
    pub fn new(user_id: Uuid, name: String, sport_category: SportCategory) -> Self {
        let mut stats = CharacterStats::base();
        let bonus = sport_category.bonus_stats();
        stats.strength += bonus.strength;
        stats.agility += bonus.agility;
        stats.endurance += bonus.endurance;
        stats.intelligence += bonus.intelligence;

        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            level: 1,
            experience: 0,
            experience_to_next: STARTING_THRESHOLD,
            sport_category,
            stats,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fraction of the current level completed, for progress bars.
    pub fn progress_fraction(&self) -> f32 {
        if self.experience_to_next == 0 {
            return 0.0;
        }
        (self.experience as f64 / self.experience_to_next as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_stats() {
        let stats = CharacterStats::base();
        assert_eq!(stats.health, 100);
        assert_eq!(stats.max_health, 100);
        assert_eq!(stats.mana, 50);
        assert_eq!(stats.max_mana, 50);
        assert_eq!(stats.strength, 10);
    }

    #[test]
    fn test_clamp_pools() {
        let mut stats = CharacterStats::base();
        stats.health = 150;
        stats.mana = 80;
        stats.clamp_pools();
        assert_eq!(stats.health, 100);
        assert_eq!(stats.mana, 50);
    }

    #[test]
    fn test_creation_applies_category_bonuses() {
        let character = Character::new(Uuid::new_v4(), "Lena".to_string(), SportCategory::Runner);

        assert_eq!(character.level, 1);
        assert_eq!(character.experience, 0);
        assert_eq!(character.experience_to_next, STARTING_THRESHOLD);
        // Runner: endurance +6, agility +2, intelligence +2
        assert_eq!(character.stats.endurance, 16);
        assert_eq!(character.stats.agility, 12);
        assert_eq!(character.stats.intelligence, 12);
        assert_eq!(character.stats.strength, 10);
    }

    #[test]
    fn test_all_categories_have_bonus_total_ten() {
        for category in SportCategory::ALL {
            let b = category.bonus_stats();
            let total = b.strength + b.agility + b.endurance + b.intelligence;
            assert_eq!(total, 10, "unbalanced bonuses for {category}");
        }
    }

    #[test]
    fn test_category_storage_round_trip() {
        for category in SportCategory::ALL {
            assert_eq!(SportCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(SportCategory::parse("curling"), None);
    }
}
