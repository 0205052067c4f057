//! Sync module.
//!
//! Host-side orchestration: polls the activity source, reconciles the
//! day's XP through the progression engine, and dispatches the resulting
//! writes to a background persistence worker.

pub mod service;

// Re-exports for convenience
pub use service::{PersistenceWorker, SyncError, SyncOutcome, SyncService};
