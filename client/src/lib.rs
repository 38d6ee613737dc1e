//! Terminal XP dashboard: signs in against the learning platform, pulls the
//! XP feed over GraphQL and shows the aggregates from `xp_stat`.

pub mod config;
pub mod report;
pub mod stat;
pub mod tui;
