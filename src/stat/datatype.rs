use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity name used when a transaction carries no object name.
pub const UNKNOWN_ENTITY: &str = "Unknown";

/// One XP grant as delivered by the gateway.
///
/// `amount` is kept as the untyped JSON value so malformed amounts survive
/// until aggregation, where they are coerced with [`coerce_amount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub amount: Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "objectName", default)]
    pub object_name: Option<String>,
}
impl RawTransaction {
    pub fn new(
        amount: impl Into<Value>,
        created_at: DateTime<Utc>,
        object_name: Option<impl Into<String>>,
    ) -> Self {
        Self {
            amount: amount.into(),
            created_at,
            object_name: object_name.map(Into::into),
        }
    }

    /// Object name, or [`UNKNOWN_ENTITY`] when absent or empty.
    pub fn entity_name(&self) -> &str {
        match self.object_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNKNOWN_ENTITY,
        }
    }
}

/// Numeric value of a raw amount. Anything that is not a finite number
/// (or a string holding one) counts as zero.
pub fn coerce_amount(amount: &Value) -> f64 {
    let n = match amount {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                parse_numeric(s).unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Decimal, or unsigned `0x`/`0o`/`0b` integer literal.
fn parse_numeric(s: &str) -> Option<f64> {
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => return s.parse().ok(),
    };
    let digits = &s[2..];
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0, |acc: f64, c| {
        c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XpPoint {
    pub timestamp: DateTime<Utc>,
    pub increment: f64,
    pub cumulative_total: f64,
    pub entity_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CumulativeSeries {
    pub points: Vec<XpPoint>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectTotal {
    pub entity_name: String,
    pub total_xp: f64,
}

/// Summary statistics over a whole series. `None` fields mark the empty
/// series.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Milestones {
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub distinct_entity_count: usize,
    pub largest_single_increment: Option<f64>,
}
impl Milestones {
    pub fn is_empty(&self) -> bool {
        self.first_timestamp.is_none()
    }
}
