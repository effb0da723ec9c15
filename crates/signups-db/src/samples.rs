//! Database operations for the append-only `signups` table.

use chrono::{DateTime, Utc};
use signups_core::Sample;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `signups` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SampleRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub count: i64,
}

impl SampleRow {
    /// The row as a [`Sample`], or `None` if the count is negative.
    #[must_use]
    pub fn to_sample(&self) -> Option<Sample> {
        (self.count >= 0).then(|| Sample::new(self.timestamp, self.count))
    }
}

/// Convert rows into a series, dropping malformed ones.
///
/// The column types already rule out missing or non-numeric values, so a
/// negative count is the only malformation left; such rows are logged and
/// skipped, the same policy the delimited-text reader applies.
#[must_use]
pub fn rows_to_series(rows: &[SampleRow]) -> Vec<Sample> {
    rows.iter()
        .filter_map(|row| {
            let sample = row.to_sample();
            if sample.is_none() {
                tracing::warn!(
                    id = row.id,
                    count = row.count,
                    "signups: dropping row with negative count"
                );
            }
            sample
        })
        .collect()
}

/// Appends one sample and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_sample(pool: &PgPool, sample: &Sample) -> Result<SampleRow, DbError> {
    let row = sqlx::query_as::<_, SampleRow>(
        "INSERT INTO signups (\"timestamp\", count) \
         VALUES ($1, $2) \
         RETURNING id, \"timestamp\", count",
    )
    .bind(sample.timestamp)
    .bind(sample.count)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the full series, ascending by timestamp (insertion order breaks ties).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_samples(pool: &PgPool) -> Result<Vec<Sample>, DbError> {
    let rows = sqlx::query_as::<_, SampleRow>(
        "SELECT id, \"timestamp\", count FROM signups \
         ORDER BY \"timestamp\" ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows_to_series(&rows))
}

/// Returns samples with `timestamp >= since`, ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_samples_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<Sample>, DbError> {
    let rows = sqlx::query_as::<_, SampleRow>(
        "SELECT id, \"timestamp\", count FROM signups \
         WHERE \"timestamp\" >= $1 \
         ORDER BY \"timestamp\" ASC, id ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows_to_series(&rows))
}

/// Returns the most recent well-formed sample, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_sample(pool: &PgPool) -> Result<Option<Sample>, DbError> {
    let row = sqlx::query_as::<_, SampleRow>(
        "SELECT id, \"timestamp\", count FROM signups \
         WHERE count >= 0 \
         ORDER BY \"timestamp\" DESC, id DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|r| r.to_sample()))
}
