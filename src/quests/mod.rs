//! Quest module.
//!
//! Activity-driven quests with XP rewards:
//! - daily/weekly/monthly quests with step, calorie, or active-minute
//!   requirements
//! - progress fed from the day's activity sample
//! - rewards routed through the progression engine exactly once

pub mod manager;
pub mod types;

// Re-exports for convenience
pub use manager::{QuestError, QuestManager};
pub use types::{Quest, QuestDifficulty, QuestRequirement, QuestType, RequirementKind};
