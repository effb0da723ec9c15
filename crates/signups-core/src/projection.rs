//! Summary statistics and goal-completion projection.
//!
//! Everything here is a pure function of the series, the target, and the
//! caller-supplied `now`, recomputed from scratch on every refresh.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Sample;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Derived summary of a series against a fixed target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_signups: i64,
    /// `None` while the first observed count is zero.
    pub growth_rate_percent: Option<f64>,
    /// Zero when the series covers no elapsed time.
    pub average_per_hour: f64,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub days_remaining: i64,
    pub last_day_growth: i64,
}

impl Stats {
    /// Whether the goal counts as achieved for display purposes.
    ///
    /// The projection does not distinguish "target reached" from "growth
    /// stalled"; both leave `estimated_completion` empty. Only the first
    /// one also has `current >= target`.
    #[must_use]
    pub fn goal_reached(&self, current: i64, target: i64) -> bool {
        self.estimated_completion.is_none() && current >= target
    }
}

/// Progress of the live count toward the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub current: i64,
    pub target: i64,
    pub percent: f64,
    /// Negative once the target has been passed.
    pub remaining: i64,
}

/// Compute [`Stats`] for `series` against `target`.
///
/// Returns `None` when the series has fewer than two samples.
#[must_use]
pub fn project(series: &[Sample], target: i64, now: DateTime<Utc>) -> Option<Stats> {
    if series.len() < 2 {
        return None;
    }
    let first = series.first()?;
    let latest = series.last()?;

    #[allow(clippy::cast_precision_loss)]
    let hours_diff = (latest.timestamp - first.timestamp).num_milliseconds() as f64 / MILLIS_PER_HOUR;
    let signup_diff = latest.count - first.count;

    #[allow(clippy::cast_precision_loss)]
    let average_per_hour = if hours_diff > 0.0 {
        signup_diff as f64 / hours_diff
    } else {
        0.0
    };

    #[allow(clippy::cast_precision_loss)]
    let growth_rate_percent =
        (first.count != 0).then(|| signup_diff as f64 / first.count as f64 * 100.0);

    let remaining = target - latest.count;
    let (estimated_completion, days_remaining) = if average_per_hour > 0.0 && remaining > 0 {
        #[allow(clippy::cast_precision_loss)]
        let hours_remaining = remaining as f64 / average_per_hour;
        #[allow(clippy::cast_possible_truncation)]
        let days = (hours_remaining / 24.0).ceil() as i64;
        (completion_at(now, hours_remaining), days)
    } else {
        (None, 0)
    };

    Some(Stats {
        total_signups: latest.count,
        growth_rate_percent,
        average_per_hour,
        estimated_completion,
        days_remaining,
        last_day_growth: last_day_growth(series, now),
    })
}

/// Growth across the samples observed in the 24 hours before `now`.
fn last_day_growth(series: &[Sample], now: DateTime<Utc>) -> i64 {
    let cutoff = now - TimeDelta::days(1);
    let mut recent = series.iter().filter(|s| s.timestamp >= cutoff);
    let Some(first) = recent.next() else {
        return 0;
    };
    recent.last().map_or(0, |last| last.count - first.count)
}

/// `now + hours`, or `None` if the instant is not representable.
fn completion_at(now: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    #[allow(clippy::cast_possible_truncation)]
    let millis = (hours * MILLIS_PER_HOUR).round() as i64;
    TimeDelta::try_milliseconds(millis).and_then(|delta| now.checked_add_signed(delta))
}

/// Progress of `current` toward `target`.
#[must_use]
pub fn progress(current: i64, target: i64) -> Progress {
    #[allow(clippy::cast_precision_loss)]
    let percent = if target > 0 {
        current as f64 / target as f64 * 100.0
    } else {
        0.0
    };
    Progress {
        current,
        target,
        percent,
        remaining: target - current,
    }
}

/// Whole minutes elapsed since `timestamp`, never negative.
#[must_use]
pub fn minutes_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - timestamp).num_minutes().max(0)
}
