//! Activity sources.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use thiserror::Error;

use super::types::DailyActivity;

/// Sensor errors.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Activity sensor unavailable: {0}")]
    Unavailable(String),
}

/// Something that can report a day's activity counters.
///
/// On a device this is backed by the pedometer. Reads are cumulative for
/// the requested day and may fluctuate between calls; deduplication is
/// the ledger's job, not the source's.
pub trait ActivitySource {
    /// Report the cumulative activity recorded so far for `date`.
    fn daily_activity(&mut self, date: NaiveDate) -> Result<DailyActivity, SensorError>;
}

/// Stand-in for the device pedometer.
///
/// Mirrors the mock fallback the mobile client used when pedometer
/// permissions were denied: a baseline of a couple thousand steps plus
/// variation, advancing as the session goes on.
pub struct SimulatedPedometer {
    steps: u32,
}

impl SimulatedPedometer {
    /// Source starting at a fixed step count.
    pub fn new(initial_steps: u32) -> Self {
        Self {
            steps: initial_steps,
        }
    }

    /// Source seeded from the clock: 2000 steps plus up to 3000 variation.
    pub fn seeded_from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        Self::new(2000 + nanos % 3000)
    }

    /// Advance the counter, as if more steps were recorded.
    pub fn add_steps(&mut self, steps: u32) {
        self.steps = self.steps.saturating_add(steps);
    }

    /// Current simulated step count.
    pub fn steps(&self) -> u32 {
        self.steps
    }
}

impl ActivitySource for SimulatedPedometer {
    fn daily_activity(&mut self, date: NaiveDate) -> Result<DailyActivity, SensorError> {
        Ok(DailyActivity::from_steps(self.steps, date))
    }
}
