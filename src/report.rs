//! Human-readable status reports over frontier snapshots.

use std::fmt::Write;

use crate::frontier::FrontierStats;
use crate::item::NEVER_MS;
use crate::registry::QueueSnapshot;

/// How far away a queue's next-ready time is, as the operator reads it.
fn ready_in(next_ready_ms: u64, now_ms: u64) -> String {
    if next_ready_ms == NEVER_MS {
        "never".to_string()
    } else if next_ready_ms <= now_ms {
        "now".to_string()
    } else {
        format!("{}ms", next_ready_ms - now_ms)
    }
}

/// One line, most urgent queue first: `origin (ready-in)` pairs.
pub fn one_line_report(rows: &[QueueSnapshot], now_ms: u64) -> String {
    let mut out = format!("{} queues:", rows.len());
    for row in rows {
        let _ = write!(out, " {} ({})", row.origin, ready_in(row.next_ready_ms, now_ms));
    }
    out
}

/// Full multi-line report: aggregate counters, then one row per queue in
/// dispatch order.
pub fn frontier_report(stats: &FrontierStats, rows: &[QueueSnapshot], now_ms: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{stats}");
    let _ = writeln!(
        out,
        "{:<40} {:>8} {:>6} {:>10} {:>12}",
        "origin", "state", "size", "in-flight", "next-ready"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<40} {:>8} {:>6} {:>7}/{:<2} {:>12}",
            row.origin,
            row.state.to_string(),
            row.size,
            row.in_flight,
            row.valence,
            ready_in(row.next_ready_ms, now_ms)
        );
    }
    out
}
