//! Dashboard series windows (`all`, `7d`, `24h`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Sample;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "24h")]
    Day,
}

impl TimeRange {
    /// Length of the window, or `None` for the unbounded range.
    #[must_use]
    pub fn window(self) -> Option<TimeDelta> {
        match self {
            TimeRange::All => None,
            TimeRange::Week => Some(TimeDelta::days(7)),
            TimeRange::Day => Some(TimeDelta::days(1)),
        }
    }

    /// Keep the samples with `timestamp >= now - window`.
    ///
    /// Order is preserved, so an ascending input stays ascending.
    #[must_use]
    pub fn filter(self, series: &[Sample], now: DateTime<Utc>) -> Vec<Sample> {
        match self.window() {
            None => series.to_vec(),
            Some(window) => {
                let cutoff = now - window;
                series
                    .iter()
                    .filter(|s| s.timestamp >= cutoff)
                    .copied()
                    .collect()
            }
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::All => write!(f, "all"),
            TimeRange::Week => write!(f, "7d"),
            TimeRange::Day => write!(f, "24h"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TimeRange::All),
            "7d" => Ok(TimeRange::Week),
            "24h" => Ok(TimeRange::Day),
            other => Err(format!("unknown time range '{other}' (expected all, 7d or 24h)")),
        }
    }
}
