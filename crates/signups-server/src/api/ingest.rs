use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use signups_fetcher::{IngestError, IngestOutcome};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(super) enum IngestData {
    Recorded {
        count: i64,
        timestamp: DateTime<Utc>,
    },
    BelowMinimum {
        count: i64,
        min_count: i64,
    },
}

impl From<IngestOutcome> for IngestData {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Recorded(sample) => Self::Recorded {
                count: sample.count,
                timestamp: sample.timestamp,
            },
            IngestOutcome::BelowMinimum { count, min_count } => {
                Self::BelowMinimum { count, min_count }
            }
        }
    }
}

pub(super) fn map_ingest_error(request_id: String, error: &IngestError) -> ApiError {
    match error {
        IngestError::Fetch(e) => {
            tracing::warn!(error = %e, "ingest: on-demand fetch failed");
            ApiError::new(request_id, "upstream_error", "failed to fetch signup count")
        }
        IngestError::Store(e) => {
            tracing::error!(error = %e, "ingest: on-demand store write failed");
            ApiError::new(request_id, "internal_error", "failed to store sample")
        }
    }
}

/// Runs one ingestion tick immediately. A recorded sample reaches the
/// dashboard through the usual change notification.
pub(super) async fn trigger_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<IngestData>>, ApiError> {
    let outcome = state
        .ingest
        .run()
        .await
        .map_err(|e| map_ingest_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
