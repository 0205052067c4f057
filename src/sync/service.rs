//! Daily synchronization between the activity source and the progression
//! engine.

use std::thread::{self, JoinHandle};

use chrono::NaiveDate;
use crossbeam::channel::{unbounded, Sender};
use thiserror::Error;

use crate::character::Character;
use crate::progression::{reconcile_daily_xp, DailyXpEntry, PersistRecord, ProgressionError};
use crate::sensors::{ActivitySource, DailyActivity};
use crate::storage::Database;

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Progression error: {0}")]
    Progression(#[from] ProgressionError),
}

/// Outcome of one sync pass.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The activity sample the pass was based on
    pub activity: DailyActivity,
    /// Experience credited by this pass
    pub awarded: u64,
    /// Level-ups triggered by this pass
    pub levels_gained: u32,
    /// Ledger entry to carry into the next pass
    pub ledger: Option<DailyXpEntry>,
}

/// Background writer that applies persistence records on its own thread.
///
/// Failures are logged as warnings and never reach the caller: the
/// in-memory transition already committed, and the ledger catches up on
/// the next reconciliation pass.
pub struct PersistenceWorker {
    tx: Sender<PersistRecord>,
    handle: JoinHandle<()>,
}

impl PersistenceWorker {
    /// Spawn a worker owning its own database connection.
    pub fn spawn(db: Database) -> Self {
        let (tx, rx) = unbounded::<PersistRecord>();

        let handle = thread::spawn(move || {
            for record in rx {
                if let Err(e) = db.apply(&record) {
                    tracing::warn!(error = %e, ?record, "persistence failed, local state stands");
                }
            }
        });

        Self { tx, handle }
    }

    /// Sender for dispatching records to this worker.
    pub fn sender(&self) -> Sender<PersistRecord> {
        self.tx.clone()
    }

    /// Close the channel and wait for queued writes to drain.
    pub fn shutdown(self) {
        drop(self.tx);
        if self.handle.join().is_err() {
            tracing::warn!("persistence worker panicked during shutdown");
        }
    }
}

/// Orchestrates one user session's activity-to-XP pipeline.
pub struct SyncService<S> {
    source: S,
    persist_tx: Sender<PersistRecord>,
}

impl<S: ActivitySource> SyncService<S> {
    /// Create a service over an activity source and a persistence sender.
    pub fn new(source: S, persist_tx: Sender<PersistRecord>) -> Self {
        Self { source, persist_tx }
    }

    /// Run one reconciliation pass for `day`.
    ///
    /// An unavailable sensor degrades to a zero-activity read; it is not
    /// an error. The character mutation is synchronous, the writes are
    /// fire-and-forget.
    pub fn run(
        &mut self,
        character: &mut Character,
        ledger: Option<&DailyXpEntry>,
        day: NaiveDate,
    ) -> Result<SyncOutcome, SyncError> {
        let activity = match self.source.daily_activity(day) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(error = %e, %day, "sensor unavailable, counting zero activity");
                DailyActivity::empty(day)
            }
        };

        let outcome = reconcile_daily_xp(character, ledger, day, activity.xp_value())?;

        if outcome.awarded > 0 {
            self.dispatch(PersistRecord::Activity {
                user_id: character.user_id,
                activity,
            });
        }
        for record in outcome.persist {
            self.dispatch(record);
        }

        Ok(SyncOutcome {
            activity,
            awarded: outcome.awarded,
            levels_gained: outcome.levels_gained,
            ledger: outcome.ledger,
        })
    }

    /// Access the underlying source, e.g. to advance a simulation.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn dispatch(&self, record: PersistRecord) {
        if self.persist_tx.send(record).is_err() {
            tracing::warn!("persistence worker gone, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::SportCategory;
    use crate::sensors::{SensorError, SimulatedPedometer};
    use crossbeam::channel::Receiver;
    use uuid::Uuid;

    struct DeadSensor;

    impl ActivitySource for DeadSensor {
        fn daily_activity(&mut self, _date: NaiveDate) -> Result<DailyActivity, SensorError> {
            Err(SensorError::Unavailable("no pedometer".to_string()))
        }
    }

    fn test_character() -> Character {
        Character::new(Uuid::new_v4(), "Test".to_string(), SportCategory::Soccer)
    }

    fn channel() -> (Sender<PersistRecord>, Receiver<PersistRecord>) {
        unbounded()
    }

    #[test]
    fn test_run_awards_and_dispatches() {
        let (tx, rx) = channel();
        let mut service = SyncService::new(SimulatedPedometer::new(3000), tx);
        let mut character = test_character();
        let day: NaiveDate = "2025-06-01".parse().unwrap();

        let outcome = service.run(&mut character, None, day).unwrap();

        assert_eq!(outcome.activity.steps, 3000);
        assert!(outcome.awarded > 0);
        assert_eq!(outcome.ledger.as_ref().unwrap().cumulative_xp, outcome.awarded);

        // Activity + progress + ledger
        let records: Vec<_> = rx.try_iter().collect();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .any(|r| matches!(r, PersistRecord::Activity { .. })));
    }

    #[test]
    fn test_second_pass_without_new_steps_is_silent() {
        let (tx, rx) = channel();
        let mut service = SyncService::new(SimulatedPedometer::new(3000), tx);
        let mut character = test_character();
        let day: NaiveDate = "2025-06-01".parse().unwrap();

        let first = service.run(&mut character, None, day).unwrap();
        rx.try_iter().count();

        let second = service
            .run(&mut character, first.ledger.as_ref(), day)
            .unwrap();

        assert_eq!(second.awarded, 0);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_dead_sensor_degrades_to_zero_activity() {
        let (tx, rx) = channel();
        let mut service = SyncService::new(DeadSensor, tx);
        let mut character = test_character();
        let day: NaiveDate = "2025-06-01".parse().unwrap();

        let outcome = service.run(&mut character, None, day).unwrap();

        assert_eq!(outcome.awarded, 0);
        assert_eq!(outcome.activity.steps, 0);
        assert_eq!(character.experience, 0);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_worker_applies_records_to_database() {
        use crate::character::UserAccount;

        let db = Database::open_in_memory().unwrap();
        let user = UserAccount::new("sync@example.com".to_string(), "sync".to_string());
        db.upsert_user(&user).unwrap();
        let character = Character::new(user.id, "Sync".to_string(), SportCategory::Cyclist);
        db.insert_character(&character).unwrap();

        let worker = PersistenceWorker::spawn(db);
        let tx = worker.sender();
        tx.send(PersistRecord::CharacterProgress {
            user_id: user.id,
            experience: 10,
            level: 2,
        })
        .unwrap();
        drop(tx);
        // shutdown drains the queue before joining
        worker.shutdown();
    }
}
