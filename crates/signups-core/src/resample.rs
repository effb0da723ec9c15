//! Fixed-cadence resampling of an irregular count series.
//!
//! [`resample`] turns an ascending, irregularly-timestamped series into a
//! run of equal-width buckets. A bucket only carries a count when a sample
//! actually fell inside it; gaps stay empty so the renderer decides how to
//! draw them. [`value_at_index`] fills a single empty slot on demand by
//! linear interpolation over bucket indices (tooltips, hover readouts).

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Sample;

/// Resampling granularity, chosen from the observation span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketWidth {
    TenMinutes,
    Hour,
    Day,
}

impl BucketWidth {
    /// Pick the tier for a span between the first and last sample.
    ///
    /// | span                 | width      |
    /// |----------------------|------------|
    /// | `<= 1 day`           | 10 minutes |
    /// | `<= 7 days`          | 1 hour     |
    /// | longer               | 1 day      |
    #[must_use]
    pub fn for_span(span: TimeDelta) -> Self {
        if span <= TimeDelta::days(1) {
            BucketWidth::TenMinutes
        } else if span <= TimeDelta::days(7) {
            BucketWidth::Hour
        } else {
            BucketWidth::Day
        }
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        match self {
            BucketWidth::TenMinutes => TimeDelta::minutes(10),
            BucketWidth::Hour => TimeDelta::hours(1),
            BucketWidth::Day => TimeDelta::days(1),
        }
    }
}

/// A fixed-width slot `[bucket_start, bucket_start + width)` in the display series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket_start: DateTime<Utc>,
    /// `None` when no sample landed in this slot.
    pub count: Option<i64>,
}

impl Bucket {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count.is_none()
    }
}

/// Resample `series` into equal-width buckets.
///
/// Returns an empty vector for an empty series.
#[must_use]
pub fn resample(series: &[Sample]) -> Vec<Bucket> {
    resample_with_width(series).map_or_else(Vec::new, |(_, buckets)| buckets)
}

/// Resample `series` and report the tier that was chosen.
///
/// Bucket starts run from the first timestamp to the last, inclusive. Each
/// bucket takes the count of the first not-yet-consumed sample inside it.
/// Samples are walked once with a forward cursor: anything earlier than the
/// current bucket start (a second sample in an already-filled bucket) is
/// passed over, and no sample is ever consumed by two buckets.
///
/// Returns `None` for an empty series.
#[must_use]
pub fn resample_with_width(series: &[Sample]) -> Option<(BucketWidth, Vec<Bucket>)> {
    let first = series.first()?.timestamp;
    let last = series.last()?.timestamp;

    let width = BucketWidth::for_span(last - first);
    let step = width.duration();

    let expected = usize::try_from((last - first).num_seconds() / step.num_seconds())
        .map_or(0, |n| n.saturating_add(1));
    let mut buckets = Vec::with_capacity(expected);

    let mut cursor = 0usize;
    let mut start = first;
    while start <= last {
        let end = start + step;

        while cursor < series.len() && series[cursor].timestamp < start {
            cursor += 1;
        }

        let count = match series.get(cursor) {
            Some(sample) if sample.timestamp < end => {
                cursor += 1;
                Some(sample.count)
            }
            _ => None,
        };

        buckets.push(Bucket {
            bucket_start: start,
            count,
        });
        start = end;
    }

    Some((width, buckets))
}

/// Value to display at bucket `index`.
///
/// A filled bucket returns its own count. An empty one is estimated from
/// the nearest filled neighbours: both sides present gives linear
/// interpolation by index distance, one side present gives that side's
/// value unchanged, neither gives `None`. Out-of-range indices give `None`.
///
/// Index distance is proportional to elapsed time because every bucket in
/// a [`resample`] output has the same width.
#[must_use]
pub fn value_at_index(buckets: &[Bucket], index: usize) -> Option<i64> {
    let bucket = buckets.get(index)?;
    if let Some(count) = bucket.count {
        return Some(count);
    }

    let left = buckets[..index]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, b)| b.count.map(|c| (i, c)));
    let right = buckets[index + 1..]
        .iter()
        .enumerate()
        .find_map(|(offset, b)| b.count.map(|c| (index + 1 + offset, c)));

    match (left, right) {
        (None, None) => None,
        (Some((_, value)), None) | (None, Some((_, value))) => Some(value),
        (Some((left_idx, left_val)), Some((right_idx, right_val))) => {
            #[allow(clippy::cast_precision_loss)]
            let t = (index - left_idx) as f64 / (right_idx - left_idx) as f64;
            #[allow(clippy::cast_precision_loss)]
            let estimate = left_val as f64 + (right_val - left_val) as f64 * t;
            Some(round_half_up(estimate))
        }
    }
}

/// Round to the nearest integer, ties toward positive infinity.
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn sample(offset: TimeDelta, count: i64) -> Sample {
        Sample::new(t0() + offset, count)
    }

    fn bucket(count: Option<i64>) -> Bucket {
        Bucket {
            bucket_start: t0(),
            count,
        }
    }

    #[test]
    fn empty_series_yields_no_buckets() {
        assert!(resample(&[]).is_empty());
        assert!(resample_with_width(&[]).is_none());
    }

    #[test]
    fn single_sample_yields_single_bucket() {
        let buckets = resample(&[sample(TimeDelta::zero(), 42)]);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].bucket_start, t0());
        assert_eq!(buckets[0].count, Some(42));
    }

    #[test]
    fn span_of_exactly_one_day_uses_ten_minute_buckets() {
        let series = [sample(TimeDelta::zero(), 1), sample(TimeDelta::days(1), 2)];
        let (width, buckets) = resample_with_width(&series).unwrap();
        assert_eq!(width, BucketWidth::TenMinutes);
        assert_eq!(buckets.len(), 145);
        assert_eq!(buckets.last().unwrap().count, Some(2));
    }

    #[test]
    fn span_just_over_one_day_uses_hourly_buckets() {
        let series = [
            sample(TimeDelta::zero(), 1),
            sample(TimeDelta::days(1) + TimeDelta::seconds(1), 2),
        ];
        let (width, buckets) = resample_with_width(&series).unwrap();
        assert_eq!(width, BucketWidth::Hour);
        assert_eq!(buckets.len(), 25);
        assert_eq!(buckets.last().unwrap().count, Some(2));
    }

    #[test]
    fn span_over_seven_days_uses_daily_buckets() {
        let series = [
            sample(TimeDelta::zero(), 1),
            sample(TimeDelta::days(7), 5),
            sample(TimeDelta::days(7) + TimeDelta::hours(1), 6),
        ];
        let (width, buckets) = resample_with_width(&series).unwrap();
        assert_eq!(width, BucketWidth::Day);
        assert_eq!(buckets.len(), 8);
        assert_eq!(buckets[7].count, Some(5));
    }

    #[test]
    fn seven_day_span_stays_hourly() {
        assert_eq!(BucketWidth::for_span(TimeDelta::days(7)), BucketWidth::Hour);
        assert_eq!(
            BucketWidth::for_span(TimeDelta::days(7) + TimeDelta::seconds(1)),
            BucketWidth::Day
        );
    }

    #[test]
    fn bucket_starts_are_uniform_and_cover_the_span() {
        let series = [
            sample(TimeDelta::zero(), 10),
            sample(TimeDelta::minutes(7), 11),
            sample(TimeDelta::minutes(95), 15),
            sample(TimeDelta::hours(5) + TimeDelta::minutes(3), 30),
        ];
        let buckets = resample(&series);

        assert_eq!(buckets.first().unwrap().bucket_start, t0());
        let last_start = buckets.last().unwrap().bucket_start;
        assert!(last_start <= series[3].timestamp);
        assert!(last_start + TimeDelta::minutes(10) > series[3].timestamp);

        for pair in buckets.windows(2) {
            assert_eq!(
                pair[1].bucket_start - pair[0].bucket_start,
                TimeDelta::minutes(10)
            );
        }
    }

    #[test]
    fn gaps_stay_empty() {
        let series = [
            sample(TimeDelta::zero(), 100),
            sample(TimeDelta::minutes(40), 130),
        ];
        let counts: Vec<Option<i64>> = resample(&series).iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![Some(100), None, None, None, Some(130)]);
    }

    #[test]
    fn every_sample_lands_in_exactly_one_bucket_when_sparse() {
        let offsets = [0, 12, 25, 31, 58, 119, 180];
        let series: Vec<Sample> = offsets
            .iter()
            .zip(1..)
            .map(|(m, c)| sample(TimeDelta::minutes(*m), c))
            .collect();

        let buckets = resample(&series);
        let filled: Vec<i64> = buckets.iter().filter_map(|b| b.count).collect();
        assert_eq!(filled, (1..=7).collect::<Vec<_>>());

        for b in buckets.iter().filter(|b| !b.is_empty()) {
            let owner = series
                .iter()
                .find(|s| Some(s.count) == b.count)
                .unwrap();
            assert!(owner.timestamp >= b.bucket_start);
            assert!(owner.timestamp < b.bucket_start + TimeDelta::minutes(10));
        }
    }

    #[test]
    fn first_sample_in_a_crowded_bucket_wins() {
        let series = [
            sample(TimeDelta::zero(), 5),
            sample(TimeDelta::minutes(1), 6),
            sample(TimeDelta::minutes(2), 7),
            sample(TimeDelta::minutes(11), 8),
        ];
        let counts: Vec<Option<i64>> = resample(&series).iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![Some(5), Some(8)]);
    }

    #[test]
    fn duplicate_timestamps_are_consumed_once() {
        let series = [
            sample(TimeDelta::zero(), 1),
            sample(TimeDelta::zero(), 2),
            sample(TimeDelta::minutes(20), 3),
        ];
        let counts: Vec<Option<i64>> = resample(&series).iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![Some(1), None, Some(3)]);
    }

    #[test]
    fn interpolates_by_index_distance() {
        let buckets = [
            bucket(Some(100)),
            bucket(None),
            bucket(None),
            bucket(Some(130)),
        ];
        assert_eq!(value_at_index(&buckets, 1), Some(110));
        assert_eq!(value_at_index(&buckets, 2), Some(120));
    }

    #[test]
    fn filled_bucket_returns_its_own_value() {
        let buckets = [bucket(Some(100)), bucket(None), bucket(Some(130))];
        assert_eq!(value_at_index(&buckets, 0), Some(100));
        assert_eq!(value_at_index(&buckets, 2), Some(130));
    }

    #[test]
    fn one_sided_gap_is_flat() {
        let buckets = [bucket(None), bucket(Some(50)), bucket(None), bucket(None)];
        assert_eq!(value_at_index(&buckets, 0), Some(50));
        assert_eq!(value_at_index(&buckets, 3), Some(50));
    }

    #[test]
    fn no_data_anywhere_is_none() {
        let buckets = [bucket(None), bucket(None), bucket(None)];
        for i in 0..buckets.len() {
            assert_eq!(value_at_index(&buckets, i), None);
        }
        assert_eq!(value_at_index(&[], 0), None);
    }

    #[test]
    fn out_of_range_index_is_none() {
        let buckets = [bucket(Some(1))];
        assert_eq!(value_at_index(&buckets, 1), None);
    }

    #[test]
    fn interpolation_rounds_half_up() {
        let buckets = [bucket(Some(0)), bucket(None), bucket(Some(1))];
        assert_eq!(value_at_index(&buckets, 1), Some(1));

        let falling = [bucket(Some(1)), bucket(None), bucket(Some(0))];
        assert_eq!(value_at_index(&falling, 1), Some(1));
    }

    #[test]
    fn bucket_serializes_empty_as_null() {
        let json = serde_json::to_value(bucket(None)).unwrap();
        assert!(json["count"].is_null());
        assert!(json["bucket_start"].is_string());
    }
}
