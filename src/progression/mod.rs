//! Progression module.
//!
//! Pure state transitions over a character:
//! - experience awards with compounding level-up thresholds and fixed
//!   per-level stat growth
//! - the per-user, per-day ledger that makes sensor-derived awards
//!   idempotent
//!
//! The engine holds no global state and performs no I/O; it emits
//! [`PersistRecord`] values the host dispatches to storage.

pub mod engine;
pub mod ledger;

// Re-exports for convenience
pub use engine::{
    award_experience, recheck_level, AwardOutcome, PersistRecord, ProgressionError,
};
pub use ledger::{reconcile_daily_xp, DailyXpEntry, ReconcileOutcome};
