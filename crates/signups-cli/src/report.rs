//! Plain-text rendering for the `stats` and `chart` commands.
//!
//! Rendering is kept separate from I/O so the output can be asserted on
//! directly.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use signups_core::{
    progress, project, resample_with_width, value_at_index, BucketWidth, Sample, TimeRange,
};

fn width_label(width: BucketWidth) -> &'static str {
    match width {
        BucketWidth::TenMinutes => "10 minutes",
        BucketWidth::Hour => "1 hour",
        BucketWidth::Day => "1 day",
    }
}

fn fmt_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Summary statistics for `series` (already cut to `range`).
pub(crate) fn render_stats(
    series: &[Sample],
    range: TimeRange,
    target: i64,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "range:                {range} ({} records)", series.len());

    let Some(stats) = project(series, target, now) else {
        let _ = writeln!(out, "not enough data: at least two samples are needed");
        return out;
    };

    let growth = stats
        .growth_rate_percent
        .map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.1}%"));
    let completion = match stats.estimated_completion {
        Some(at) => format!("{} ({} days)", fmt_time(at), stats.days_remaining),
        None if stats.goal_reached(stats.total_signups, target) => "goal reached".to_string(),
        None => "n/a".to_string(),
    };
    let progress = progress(stats.total_signups, target);

    let _ = writeln!(out, "total signups:        {}", stats.total_signups);
    let _ = writeln!(out, "growth rate:          {growth}");
    let _ = writeln!(out, "average per hour:     {:.2}", stats.average_per_hour);
    let _ = writeln!(out, "last 24h growth:      {:+}", stats.last_day_growth);
    let _ = writeln!(
        out,
        "progress:             {} / {} ({:.1}%), {} remaining",
        progress.current,
        progress.target,
        progress.percent,
        progress.remaining.max(0)
    );
    let _ = writeln!(out, "estimated completion: {completion}");
    out
}

/// One line per bucket. Empty buckets show their interpolated value,
/// marked with `~`, or `-` when nothing can be estimated.
pub(crate) fn render_chart(series: &[Sample], range: TimeRange) -> String {
    let mut out = String::new();
    let Some((width, buckets)) = resample_with_width(series) else {
        let _ = writeln!(out, "no data for range {range}");
        return out;
    };

    let _ = writeln!(
        out,
        "range {range}, {} buckets of {}",
        buckets.len(),
        width_label(width)
    );
    for (index, bucket) in buckets.iter().enumerate() {
        let value = match (bucket.count, value_at_index(&buckets, index)) {
            (Some(count), _) => count.to_string(),
            (None, Some(estimate)) => format!("~{estimate}"),
            (None, None) => "-".to_string(),
        };
        let _ = writeln!(out, "{:<22}{value}", fmt_time(bucket.bucket_start));
    }
    out
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
