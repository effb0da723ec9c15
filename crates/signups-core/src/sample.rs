use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed `(timestamp, count)` pair from the signup source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub count: i64,
}

impl Sample {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, count: i64) -> Self {
        Self { timestamp, count }
    }
}

/// Latest count delivered out of band by the store's change notification.
///
/// Only drives the live counter; chart and stats data always come from a
/// full re-read of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCount {
    pub count: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<Sample> for LiveCount {
    fn from(sample: Sample) -> Self {
        Self {
            count: sample.count,
            timestamp: sample.timestamp,
        }
    }
}
