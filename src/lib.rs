//! FitQuest - Fitness Gamification Core
//!
//! Turns real-world activity into game progression: steps and derived
//! calories, active minutes, and distance become experience points;
//! characters level up with compounding thresholds and fixed stat growth;
//! and a per-user, per-day ledger keeps repeated sensor reads from ever
//! double-awarding the same activity.

pub mod character;
pub mod progression;
pub mod quests;
pub mod sensors;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use character::{Character, CharacterStats, SportCategory};
pub use progression::{award_experience, reconcile_daily_xp, DailyXpEntry, PersistRecord};
pub use sensors::{ActivitySource, DailyActivity, SimulatedPedometer};
pub use storage::Database;
pub use sync::{PersistenceWorker, SyncService};
