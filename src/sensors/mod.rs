//! Sensor module.
//!
//! Daily activity samples and the sources that produce them. The real
//! product reads a device pedometer; this crate consumes activity through
//! the [`ActivitySource`] trait and ships a simulated implementation for
//! tests and the demo binary.

pub mod source;
pub mod types;

// Re-exports for convenience
pub use source::{ActivitySource, SensorError, SimulatedPedometer};
pub use types::DailyActivity;
