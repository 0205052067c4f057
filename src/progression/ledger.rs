//! Daily XP ledger: dedup of sensor-derived experience.
//!
//! Sensor totals are recomputed many times a day and can fluctuate
//! (recalculation, backfill). The ledger records the cumulative XP already
//! granted per user per day so that only the delta above the recorded
//! maximum is ever awarded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::engine::{award_experience, PersistRecord, ProgressionError};
use crate::character::Character;

/// Per-user, per-day record of sensor XP already granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyXpEntry {
    /// Owning user
    pub user_id: Uuid,
    /// Calendar day (not a timestamp)
    pub date: NaiveDate,
    /// Highest cumulative sensor XP credited for this day
    pub cumulative_xp: u64,
}

impl DailyXpEntry {
    /// Fresh entry for a day with nothing credited yet.
    pub fn new(user_id: Uuid, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            cumulative_xp: 0,
        }
    }
}

/// Outcome of a daily reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// Experience actually credited by this pass
    pub awarded: u64,
    /// Level-ups triggered by this pass
    pub levels_gained: u32,
    /// Ledger entry to carry forward, if any exists after the pass
    pub ledger: Option<DailyXpEntry>,
    /// Writes for the host to dispatch
    pub persist: Vec<PersistRecord>,
}

/// Reconcile a day's cumulative sensor XP against the ledger.
///
/// An entry for a different day (or a missing entry) counts as a previous
/// cumulative of zero. Only a positive delta above the previous cumulative
/// is awarded; an equal or smaller total leaves the character and the
/// ledger untouched. Repeated passes within one day therefore credit
/// exactly the maximum cumulative value observed that day.
pub fn reconcile_daily_xp(
    character: &mut Character,
    ledger: Option<&DailyXpEntry>,
    day: NaiveDate,
    sensor_total_xp: u64,
) -> Result<ReconcileOutcome, ProgressionError> {
    let current = ledger.filter(|e| e.date == day && e.user_id == character.user_id);
    let previous = current.map(|e| e.cumulative_xp).unwrap_or(0);

    if sensor_total_xp <= previous {
        tracing::debug!(
            user_id = %character.user_id,
            %day,
            sensor_total_xp,
            previous,
            "no new sensor XP to credit"
        );
        return Ok(ReconcileOutcome {
            awarded: 0,
            levels_gained: 0,
            ledger: current.cloned(),
            persist: Vec::new(),
        });
    }

    let delta = sensor_total_xp - previous;
    let award = award_experience(character, delta.min(i64::MAX as u64) as i64)?;

    let entry = DailyXpEntry {
        user_id: character.user_id,
        date: day,
        cumulative_xp: sensor_total_xp,
    };
    let persist = vec![
        award.persist,
        PersistRecord::DailyLedger {
            user_id: entry.user_id,
            date: entry.date,
            cumulative_xp: entry.cumulative_xp,
        },
    ];

    tracing::debug!(
        user_id = %character.user_id,
        %day,
        awarded = delta,
        cumulative = sensor_total_xp,
        "credited sensor XP"
    );

    Ok(ReconcileOutcome {
        awarded: delta,
        levels_gained: award.levels_gained,
        ledger: Some(entry),
        persist,
    })
}
