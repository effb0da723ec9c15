use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signups_core::{
    minutes_since, progress, project, resample_with_width, value_at_index, Bucket, BucketWidth,
    LiveCount, Progress, Sample, Stats, TimeRange,
};

use crate::middleware::RequestId;

use super::{parse_range, require_snapshot, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RangeQuery {
    pub range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct InterpolateQuery {
    pub range: Option<String>,
    pub index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct DashboardData {
    pub range: TimeRange,
    pub current_count: Option<i64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_minutes: Option<i64>,
    pub progress: Option<Progress>,
    pub stats: Option<Stats>,
    pub goal_reached: bool,
    pub bucket_width: Option<BucketWidth>,
    pub buckets: Vec<Bucket>,
    pub record_count: usize,
    pub snapshot_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct SeriesData {
    pub range: TimeRange,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Serialize)]
pub(super) struct InterpolateData {
    pub range: TimeRange,
    pub index: usize,
    pub bucket_start: Option<DateTime<Utc>>,
    pub value: Option<i64>,
    pub interpolated: bool,
}

/// The newer of the last stored sample and the pushed live count.
pub(super) fn current_count(series: &[Sample], live: Option<LiveCount>) -> Option<LiveCount> {
    let stored = series.last().copied().map(LiveCount::from);
    match (stored, live) {
        (Some(stored), Some(live)) if live.timestamp >= stored.timestamp => Some(live),
        (Some(stored), _) => Some(stored),
        (None, live) => live,
    }
}

/// Assembles the dashboard view.
///
/// Stats are projected over the whole series; the chart and the record
/// count only cover `range`.
pub(super) fn build_dashboard(
    series: &[Sample],
    live: Option<LiveCount>,
    range: TimeRange,
    target: i64,
    now: DateTime<Utc>,
    snapshot_at: DateTime<Utc>,
) -> DashboardData {
    let current = current_count(series, live);
    let stats = project(series, target, now);
    let goal_reached = match (&stats, current) {
        (Some(stats), Some(current)) => stats.goal_reached(current.count, target),
        _ => false,
    };

    let in_range = range.filter(series, now);
    let (bucket_width, buckets) = match resample_with_width(&in_range) {
        Some((width, buckets)) => (Some(width), buckets),
        None => (None, Vec::new()),
    };

    DashboardData {
        range,
        current_count: current.map(|c| c.count),
        last_updated: current.map(|c| c.timestamp),
        last_updated_minutes: current.map(|c| minutes_since(c.timestamp, now)),
        progress: current.map(|c| progress(c.count, target)),
        stats,
        goal_reached,
        bucket_width,
        buckets,
        record_count: in_range.len(),
        snapshot_at,
    }
}

/// Value of chart bucket `index`, interpolated when the bucket is empty.
pub(super) fn interpolate(
    series: &[Sample],
    range: TimeRange,
    index: usize,
    now: DateTime<Utc>,
) -> InterpolateData {
    let buckets = resample_with_width(&range.filter(series, now))
        .map(|(_, buckets)| buckets)
        .unwrap_or_default();
    let bucket = buckets.get(index);

    InterpolateData {
        range,
        index,
        bucket_start: bucket.map(|b| b.bucket_start),
        value: value_at_index(&buckets, index),
        interpolated: bucket.is_some_and(Bucket::is_empty),
    }
}

pub(super) async fn get_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<DashboardData>>, ApiError> {
    let range = parse_range(&req_id.0, query.range.as_deref())?;
    let snapshot = require_snapshot(&state, &req_id.0).await?;
    let live = *state.live.borrow();

    let data = build_dashboard(
        &snapshot.series,
        live,
        range,
        state.target,
        Utc::now(),
        snapshot.fetched_at,
    );

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_series(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<SeriesData>>, ApiError> {
    let range = parse_range(&req_id.0, query.range.as_deref())?;
    let snapshot = require_snapshot(&state, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: SeriesData {
            range,
            samples: range.filter(&snapshot.series, Utc::now()),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn interpolate_bucket(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<InterpolateQuery>,
) -> Result<Json<ApiResponse<InterpolateData>>, ApiError> {
    let range = parse_range(&req_id.0, query.range.as_deref())?;
    let Some(index) = query.index else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "query parameter 'index' is required",
        ));
    };
    let snapshot = require_snapshot(&state, &req_id.0).await?;

    Ok(Json(ApiResponse {
        data: interpolate(&snapshot.series, range, index, Utc::now()),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeDelta, TimeZone};
    use tower::ServiceExt;

    use crate::api::test_support::{scratch_csv, state_with, TARGET};
    use crate::api::{build_app, default_rate_limit_state};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap()
    }

    fn at(hours_ago: i64, count: i64) -> Sample {
        Sample::new(now() - TimeDelta::hours(hours_ago), count)
    }

    #[test]
    fn current_count_prefers_newer_live_value() {
        let series = vec![at(2, 100), at(1, 110)];
        let live = LiveCount {
            count: 115,
            timestamp: now(),
        };
        assert_eq!(current_count(&series, Some(live)), Some(live));

        let stale = LiveCount {
            count: 90,
            timestamp: now() - TimeDelta::hours(3),
        };
        assert_eq!(current_count(&series, Some(stale)).map(|c| c.count), Some(110));
        assert_eq!(current_count(&[], Some(stale)), Some(stale));
        assert_eq!(current_count(&[], None), None);
    }

    #[test]
    fn dashboard_uses_whole_series_for_stats_and_range_for_chart() {
        // Ten days of history, one sample every 12 hours.
        let series: Vec<Sample> = (0..=20).rev().map(|i| at(i * 12, 500 - i * 10)).collect();

        let view = build_dashboard(&series, None, TimeRange::Day, TARGET, now(), now());

        assert_eq!(view.current_count, Some(500));
        assert_eq!(view.last_updated_minutes, Some(0));
        assert_eq!(view.record_count, 3);
        assert_eq!(view.bucket_width, Some(BucketWidth::TenMinutes));
        let stats = view.stats.expect("stats");
        assert_eq!(stats.total_signups, 500);
        // First sample is 300, ten days earlier.
        assert_eq!(stats.growth_rate_percent, Some(200.0 / 300.0 * 100.0));
        assert!(!view.goal_reached);
        let progress = view.progress.expect("progress");
        assert_eq!(progress.remaining, TARGET - 500);
    }

    #[test]
    fn dashboard_of_empty_series_is_blank() {
        let view = build_dashboard(&[], None, TimeRange::All, TARGET, now(), now());
        assert_eq!(view.current_count, None);
        assert!(view.stats.is_none());
        assert!(view.buckets.is_empty());
        assert_eq!(view.bucket_width, None);
        assert_eq!(view.record_count, 0);
    }

    #[test]
    fn dashboard_flags_goal_reached() {
        let series = vec![at(5, 900), at(0, 1000)];
        let view = build_dashboard(&series, None, TimeRange::All, TARGET, now(), now());
        assert!(view.goal_reached);
    }

    #[test]
    fn interpolate_fills_gap_between_known_buckets() {
        // Samples at the edges of a 30 minute window; 10 minute buckets.
        let series = vec![
            Sample::new(now() - TimeDelta::minutes(30), 100),
            Sample::new(now(), 130),
        ];

        let gap = interpolate(&series, TimeRange::All, 1, now());
        assert_eq!(gap.value, Some(110));
        assert!(gap.interpolated);

        let known = interpolate(&series, TimeRange::All, 0, now());
        assert_eq!(known.value, Some(100));
        assert!(!known.interpolated);

        let outside = interpolate(&series, TimeRange::All, 99, now());
        assert_eq!(outside.value, None);
        assert_eq!(outside.bucket_start, None);
    }

    async fn get_json(uri: &str, series: Option<Vec<Sample>>) -> (StatusCode, serde_json::Value) {
        let state = state_with(series, None, "http://127.0.0.1:1/count", scratch_csv("dash")).await;
        let response = build_app(state, default_rate_limit_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json parse"))
    }

    #[tokio::test]
    async fn dashboard_route_wraps_view_in_envelope() {
        let series = vec![
            Sample::new(Utc::now() - TimeDelta::hours(2), 400),
            Sample::new(Utc::now() - TimeDelta::hours(1), 420),
        ];
        let (status, json) = get_json("/api/v1/dashboard?range=24h", Some(series)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["range"], "24h");
        assert_eq!(json["data"]["current_count"], 420);
        assert_eq!(json["data"]["record_count"], 2);
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn dashboard_route_rejects_unknown_range() {
        let (status, json) = get_json("/api/v1/dashboard?range=1y", Some(Vec::new())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn interpolate_route_requires_index() {
        let (status, json) = get_json("/api/v1/chart/interpolate", Some(Vec::new())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn series_route_filters_by_range() {
        let series = vec![
            Sample::new(Utc::now() - TimeDelta::days(3), 100),
            Sample::new(Utc::now() - TimeDelta::hours(1), 150),
        ];
        let (status, json) = get_json("/api/v1/series?range=24h", Some(series)).await;

        assert_eq!(status, StatusCode::OK);
        let samples = json["data"]["samples"].as_array().expect("samples array");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0]["count"], 150);
    }
}
