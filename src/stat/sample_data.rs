use chrono::{DateTime, TimeZone, Utc};

use super::datatype::RawTransaction;

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Small ascending XP feed for demos and smoke tests.
pub fn sample_transactions() -> Vec<RawTransaction> {
    vec![
        RawTransaction::new(1_000_000, at(2024, 1, 1), Some("alpha")),
        RawTransaction::new(500_000, at(2024, 2, 1), Some("beta")),
        RawTransaction::new(2_000_000, at(2024, 3, 1), Some("alpha")),
        RawTransaction::new(24_500, at(2024, 3, 18), Some("go-reloaded")),
        RawTransaction::new(9_200, at(2024, 4, 2), Some("ascii-art")),
        RawTransaction::new(147_000, at(2024, 5, 20), Some("groupie-tracker")),
        RawTransaction::new(390_000, at(2024, 7, 9), None::<String>),
        RawTransaction::new(88_000, at(2024, 9, 30), Some("ascii-art")),
    ]
}
