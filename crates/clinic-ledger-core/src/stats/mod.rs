//! Income statistics: appointment counts, per-plan breakdown and therapist
//! income over a date range.

mod analysis;
mod query;

pub use analysis::*;
pub use query::*;
