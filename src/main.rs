use xp_stat::sample_data::sample_transactions;
use xp_stat::*;

fn main() {
    let transactions = sample_transactions();
    let series = build_cumulative_series(&transactions);

    println!("== XP Timeline ==\n");
    for p in &series.points {
        println!(
            "{} | {:<16} | +{:>9} | {:>9}",
            p.timestamp.format("%Y-%m-%d"),
            p.entity_name,
            format_magnitude(p.increment),
            format_magnitude(p.cumulative_total),
        );
    }

    println!(
        "\n== Total XP = {} ({}) ==\n",
        format_magnitude(series.total),
        format_grouped(series.total)
    );

    println!("== XP by project ==\n");
    for t in build_grouped_totals(&series.points).iter().take(12) {
        println!("{:<16} | {:>9}", t.entity_name, format_magnitude(t.total_xp));
    }

    let m = compute_milestones(&series.points);
    let day = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    println!("\n== Milestones ==\n");
    println!("first activity : {}", day(m.first_timestamp));
    println!("last activity  : {}", day(m.last_timestamp));
    println!("projects       : {}", m.distinct_entity_count);
    println!(
        "best single gain: {}",
        m.largest_single_increment
            .map(format_magnitude)
            .unwrap_or_else(|| "-".to_string())
    );
}
