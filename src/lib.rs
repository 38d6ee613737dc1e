//! XP aggregation: cumulative series, per-project totals, milestones and
//! KB/MB display labels over a feed of XP transactions.

pub mod stat;
pub use stat::*;
