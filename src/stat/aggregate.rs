use super::datatype::*;
use std::collections::{HashMap, HashSet};

/// Running total over `transactions` in the order given.
///
/// The input is expected to be sorted ascending by `created_at`; no sorting
/// happens here. Each point's `cumulative_total` includes its own increment.
pub fn build_cumulative_series(transactions: &[RawTransaction]) -> CumulativeSeries {
    let mut total = 0.0;
    let points = transactions
        .iter()
        .map(|tx| {
            let increment = coerce_amount(&tx.amount);
            total += increment;
            XpPoint {
                timestamp: tx.created_at,
                increment,
                cumulative_total: total,
                entity_name: tx.entity_name().to_string(),
            }
        })
        .collect();
    CumulativeSeries { points, total }
}

/// XP per entity, highest first. Equal totals keep first-seen order.
pub fn build_grouped_totals(points: &[XpPoint]) -> Vec<ProjectTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<ProjectTotal> = Vec::new();
    for p in points {
        match index.get(p.entity_name.as_str()) {
            Some(&i) => totals[i].total_xp += p.increment,
            None => {
                index.insert(p.entity_name.as_str(), totals.len());
                totals.push(ProjectTotal {
                    entity_name: p.entity_name.clone(),
                    total_xp: p.increment,
                });
            }
        }
    }
    // sort_by is stable
    totals.sort_by(|a, b| b.total_xp.total_cmp(&a.total_xp));
    totals
}

pub fn compute_milestones(points: &[XpPoint]) -> Milestones {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Milestones::default();
    };
    let mut entities: HashSet<&str> = HashSet::new();
    let mut largest = f64::NEG_INFINITY;
    for p in points {
        entities.insert(p.entity_name.as_str());
        if p.increment > largest {
            largest = p.increment;
        }
    }
    Milestones {
        first_timestamp: Some(first.timestamp),
        last_timestamp: Some(last.timestamp),
        distinct_entity_count: entities.len(),
        largest_single_increment: Some(largest),
    }
}

/// Index of the first transaction that is older than the one before it.
pub fn find_unordered(transactions: &[RawTransaction]) -> Option<usize> {
    transactions
        .windows(2)
        .position(|w| w[1].created_at < w[0].created_at)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    fn tx(amount: Value, day: u32, name: Option<&str>) -> RawTransaction {
        let at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        RawTransaction::new(amount, at, name)
    }

    #[test]
    fn empty_inputs_give_empty_outputs() {
        let series = build_cumulative_series(&[]);
        assert!(series.points.is_empty());
        assert_eq!(series.total, 0.0);
        assert!(build_grouped_totals(&[]).is_empty());
        let m = compute_milestones(&[]);
        assert!(m.is_empty());
        assert_eq!(m.distinct_entity_count, 0);
        assert_eq!(m.largest_single_increment, None);
    }

    #[test]
    fn malformed_amount_still_emits_a_point() {
        let feed = vec![
            tx(json!(100), 1, Some("a")),
            tx(json!("abc"), 2, Some("b")),
            tx(Value::Null, 3, None),
            tx(json!(50), 4, Some("a")),
        ];
        let series = build_cumulative_series(&feed);
        let cumulative: Vec<f64> = series.points.iter().map(|p| p.cumulative_total).collect();
        assert_eq!(cumulative, vec![100.0, 100.0, 100.0, 150.0]);
        assert_eq!(series.points[1].increment, 0.0);
        assert_eq!(series.points[2].entity_name, UNKNOWN_ENTITY);
        assert_eq!(series.total, 150.0);
    }

    #[test]
    fn unsorted_input_is_not_reordered() {
        let feed = vec![tx(json!(10), 5, Some("late")), tx(json!(20), 1, Some("early"))];
        let series = build_cumulative_series(&feed);
        assert_eq!(series.points[0].entity_name, "late");
        let m = compute_milestones(&series.points);
        assert_eq!(m.first_timestamp, Some(feed[0].created_at));
        assert_eq!(m.last_timestamp, Some(feed[1].created_at));
        assert_eq!(find_unordered(&feed), Some(1));
    }

    #[test]
    fn grouping_ties_keep_first_seen_order() {
        let feed = vec![
            tx(json!(5), 1, Some("zeta")),
            tx(json!(5), 2, Some("alpha")),
            tx(json!(9), 3, Some("mid")),
        ];
        let series = build_cumulative_series(&feed);
        let totals = build_grouped_totals(&series.points);
        let names: Vec<&str> = totals
            .iter()
            .map(|t| t.entity_name.as_str())
            .collect();
        assert_eq!(names, vec!["mid", "zeta", "alpha"]);
    }

    #[test]
    fn grouping_is_case_sensitive() {
        let feed = vec![tx(json!(1), 1, Some("Alpha")), tx(json!(1), 2, Some("alpha"))];
        let series = build_cumulative_series(&feed);
        assert_eq!(build_grouped_totals(&series.points).len(), 2);
    }

    #[test]
    fn largest_increment_can_be_negative() {
        let feed = vec![tx(json!(-30), 1, Some("a")), tx(json!(-10), 2, Some("a"))];
        let series = build_cumulative_series(&feed);
        let m = compute_milestones(&series.points);
        assert_eq!(m.largest_single_increment, Some(-10.0));
        assert_eq!(m.distinct_entity_count, 1);
    }

    #[test]
    fn ordered_feed_has_no_violation() {
        let feed = vec![tx(json!(1), 1, None), tx(json!(1), 1, None), tx(json!(1), 2, None)];
        assert_eq!(find_unordered(&feed), None);
        assert_eq!(find_unordered(&[]), None);
    }
}
