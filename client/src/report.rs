use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::fmt::Write;
use xp_stat::*;

use crate::stat::{RangeReport, Snapshot};

/// Projects shown in the summary and on the bar chart.
pub const TOP_PROJECTS: usize = 12;

pub fn format_day(d: Option<DateTime<Utc>>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_best(m: &Milestones) -> String {
    m.largest_single_increment
        .map(format_magnitude)
        .unwrap_or_else(|| "-".to_string())
}

/// `[from, to)` covering the last `days` days, ending at tomorrow 00:00 UTC.
///
/// `None` when the window reaches past the representable calendar.
pub fn last_days_range(now: DateTime<Utc>, days: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let tomorrow = now.date_naive().succ_opt()?;
    let to = tomorrow.and_time(NaiveTime::MIN).and_utc();
    let from = to.checked_sub_signed(Duration::days(i64::from(days)))?;
    Some((from, to))
}

pub fn render_summary(snap: &Snapshot, top: usize) -> String {
    let mut out = String::new();
    let id = &snap.identity;
    let m = &snap.milestones;
    let _ = writeln!(out, "== Profile ==\n");
    let _ = writeln!(out, "login : {}", id.display_name);
    let _ = writeln!(out, "id    : {}", id.id);
    let _ = writeln!(out, "email : {}", id.email);
    let _ = writeln!(
        out,
        "\n== Total XP = {} ({}) ==\n",
        format_magnitude(snap.series.total),
        format_grouped(snap.series.total)
    );
    let _ = writeln!(out, "== Milestones ==\n");
    let _ = writeln!(out, "first activity  : {}", format_day(m.first_timestamp));
    let _ = writeln!(out, "last activity   : {}", format_day(m.last_timestamp));
    let _ = writeln!(out, "projects        : {}", format_grouped(m.distinct_entity_count as f64));
    let _ = writeln!(out, "best single gain: {}", format_best(m));

    let _ = writeln!(out, "\n== Top {top} projects ==\n");
    if snap.projects.is_empty() {
        let _ = writeln!(out, "No XP data");
    }
    for (i, p) in snap.top_projects(top).iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:<24} {:>10}",
            i + 1,
            p.entity_name,
            format_magnitude(p.total_xp)
        );
    }
    out
}

pub fn render_range(report: &RangeReport, preview: usize, verify: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "XP range test");
    let _ = writeln!(out, "from: {}", report.from.to_rfc3339());
    let _ = writeln!(out, "to  : {}", report.to.to_rfc3339());
    let _ = writeln!(
        out,
        "server total (sum.amount): {} ({})",
        format_grouped(report.server_total),
        format_magnitude(report.server_total)
    );
    let _ = writeln!(out, "server count: {}", report.server_count);
    let _ = writeln!(out, "rows returned: {}", report.rows.len());

    if verify {
        let client_total = build_cumulative_series(&report.rows).total;
        let verdict = if client_total == report.server_total {
            "matches"
        } else {
            "DIFFERS"
        };
        let _ = writeln!(
            out,
            "client recompute: {} ({}) {verdict}",
            format_grouped(client_total),
            format_magnitude(client_total)
        );
    }

    let shown = preview.min(report.rows.len());
    let _ = writeln!(out, "\n--- First {shown} rows ---");
    for (i, row) in report.rows.iter().take(shown).enumerate() {
        let _ = writeln!(
            out,
            "{:02}. {} | +{} | {}",
            i + 1,
            row.created_at.format("%Y-%m-%d %H:%M:%S"),
            format_magnitude_value(&row.amount),
            row.entity_name()
        );
    }
    out
}
