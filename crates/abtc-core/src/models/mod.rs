//! Domain models for the bite treatment center.

mod appointment;
mod change;
mod group;
mod patient;
mod staff;
mod treatment;
mod vaccine;

pub use appointment::*;
pub use change::*;
pub use group::*;
pub use patient::*;
pub use staff::*;
pub use treatment::*;
pub use vaccine::*;
