//! Domain models for the clinic ledger.

mod appointment;
mod input;
mod patient;
mod weekday;

pub use appointment::*;
pub use input::*;
pub use patient::*;
pub use weekday::*;
