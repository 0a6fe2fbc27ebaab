//! Report formatting.

use std::io::{self, Write};

use respool_core::OverflowPolicy;

use crate::simulation::Report;

/// Format a number with thousand separators.
#[must_use]
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn policy_label(policy: OverflowPolicy) -> &'static str {
    match policy {
        OverflowPolicy::Expand => "expand",
        OverflowPolicy::RecycleOldest => "recycle-oldest",
        OverflowPolicy::RejectNull => "reject",
    }
}

/// Write the per-pool summary table.
pub fn write_table(report: &Report, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "{:<12} {:<15} {:>10} {:>9} {:>9} {:>9} {:>6} {:>6} {:>8}",
        "Pool", "Policy", "Acquired", "Hit rate", "Created", "Recycled", "Nulls", "Peak", "Idle"
    )?;
    for pool in &report.pools {
        let stats = &pool.stats;
        writeln!(
            out,
            "{:<12} {:<15} {:>10} {:>8.1}% {:>9} {:>9} {:>6} {:>6} {:>8}",
            pool.name,
            policy_label(pool.policy),
            format_number(stats.acquisitions()),
            stats.hit_rate() * 100.0,
            format_number(stats.created),
            format_number(stats.recycled),
            format_number(stats.rejected),
            pool.peak_active,
            pool.idle,
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{} ticks, {} idle instances shrunk, {} released at teardown",
        format_number(report.ticks),
        format_number(report.shrunk as u64),
        format_number(report.torn_down as u64),
    )
}

/// Write the report as pretty-printed JSON.
pub fn write_json(report: &Report, out: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
