//! Character module.
//!
//! The player-facing persona: one character per user, tied to a real-world
//! sport category that seeds its starting stats.

pub mod types;

// Re-exports for convenience
pub use types::{Character, CharacterStats, SportCategory, StatBonuses, UserAccount};
