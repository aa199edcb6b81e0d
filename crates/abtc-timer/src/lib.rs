//! Multi-timer widget state for clinic workstations.
//!
//! Nurses run several countdowns at once (observation after a RIG
//! injection, skin test reads, wound washing). This crate holds the
//! timers; the caller supplies the clock as a `Duration` since any fixed
//! epoch, so the same inputs always give the same results.

pub mod board;
pub mod timer;

pub use board::*;
pub use timer::*;
