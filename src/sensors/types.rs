//! Daily activity sample and derived-metric estimation.
//!
//! The pedometer only reports a step count. Calories, distance, and
//! active minutes are rough estimates derived from steps, matching the
//! mobile client this engine was extracted from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Average step length in meters.
pub const METERS_PER_STEP: f64 = 0.762;
/// Estimated calories burned per step (25 steps per calorie).
pub const CALORIES_PER_STEP: f64 = 0.04;
/// Steps counted as one active minute.
pub const STEPS_PER_ACTIVE_MINUTE: u32 = 120;

/// One calendar day of activity counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Steps recorded by the pedometer
    pub steps: u32,
    /// Estimated calories burned
    pub calories: u32,
    /// Estimated minutes of activity
    pub active_minutes: u32,
    /// Estimated distance covered in meters
    pub distance_meters: f64,
    /// The day these counters belong to
    pub date: NaiveDate,
}

impl DailyActivity {
    /// Build a sample from a raw step count, estimating the other
    /// counters.
    pub fn from_steps(steps: u32, date: NaiveDate) -> Self {
        Self {
            steps,
            calories: (steps as f64 * CALORIES_PER_STEP).floor() as u32,
            active_minutes: steps / STEPS_PER_ACTIVE_MINUTE,
            distance_meters: steps as f64 * METERS_PER_STEP,
            date,
        }
    }

    /// A day with no recorded activity.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            steps: 0,
            calories: 0,
            active_minutes: 0,
            distance_meters: 0.0,
            date,
        }
    }

    /// Cumulative XP value of this sample.
    ///
    /// 1 XP per 100 steps, 1 per 10 calories, 2 per active minute, 1 per
    /// meter. The distance term dominating the others is intentional
    /// product behavior.
    pub fn xp_value(&self) -> u64 {
        let step_xp = (self.steps / 100) as u64;
        let calorie_xp = (self.calories / 10) as u64;
        let minute_xp = 2 * self.active_minutes as u64;
        let distance_xp = self.distance_meters.max(0.0).floor() as u64;

        step_xp + calorie_xp + minute_xp + distance_xp
    }
}
