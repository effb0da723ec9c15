//! One ingestion tick: fetch the remote count and append it to a store.
//!
//! [`ingest_once`] never panics and never schedules anything itself; the
//! caller logs the outcome and waits for its next tick.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use signups_core::{delimited, Sample};
use sqlx::PgPool;
use tokio::io::AsyncWriteExt;

use crate::client::CountClient;
use crate::error::{FetchError, IngestError, StoreError};
use crate::retry::retry_with_backoff;

/// Append-only destination for fetched samples.
#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Appends one sample.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn append(&self, sample: Sample) -> Result<(), StoreError>;
}

/// Postgres-backed sink writing to the `signups` table.
#[derive(Debug, Clone)]
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleSink for PgSink {
    async fn append(&self, sample: Sample) -> Result<(), StoreError> {
        signups_db::insert_sample(&self.pool, &sample).await?;
        Ok(())
    }
}

/// Delimited-file sink. Writes the `timestamp,count` header when the file
/// is new or empty, then appends one row per sample.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SampleSink for CsvSink {
    async fn append(&self, sample: Sample) -> Result<(), StoreError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut out = String::new();
        if file.metadata().await?.len() == 0 {
            out.push_str(delimited::HEADER);
            out.push('\n');
        }
        out.push_str(&delimited::format_row(&sample));
        out.push('\n');

        file.write_all(out.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Knobs for a single ingestion tick.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Counts below this are fetched but not recorded.
    pub min_count: i64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl IngestOptions {
    #[must_use]
    pub fn from_app_config(config: &signups_core::AppConfig) -> Self {
        Self {
            min_count: config.min_count,
            max_retries: config.fetch_max_retries,
            backoff_base_ms: config.fetch_retry_backoff_ms,
        }
    }
}

/// What a successful tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Recorded(Sample),
    BelowMinimum { count: i64, min_count: i64 },
}

/// Fetches the current count, retrying transient failures.
///
/// # Errors
///
/// Returns the final [`FetchError`] once retries are exhausted.
pub async fn fetch_with_retry(
    client: &CountClient,
    options: &IngestOptions,
) -> Result<i64, FetchError> {
    retry_with_backoff(options.max_retries, options.backoff_base_ms, || {
        client.fetch_count()
    })
    .await
}

/// Runs one ingestion tick at `now`.
///
/// The stored timestamp is `now` truncated to whole seconds.
///
/// # Errors
///
/// - [`IngestError::Fetch`] if the count could not be fetched.
/// - [`IngestError::Store`] if the sink rejected the write.
pub async fn ingest_once(
    client: &CountClient,
    sink: &dyn SampleSink,
    options: &IngestOptions,
    now: DateTime<Utc>,
) -> Result<IngestOutcome, IngestError> {
    let count = fetch_with_retry(client, options).await?;

    if count < options.min_count {
        tracing::info!(
            count,
            min_count = options.min_count,
            "ingest: fetched count below minimum; skipping write"
        );
        return Ok(IngestOutcome::BelowMinimum {
            count,
            min_count: options.min_count,
        });
    }

    let sample = Sample::new(now.trunc_subsecs(0), count);
    sink.append(sample).await?;
    tracing::info!(count, timestamp = %sample.timestamp, "ingest: recorded sample");
    Ok(IngestOutcome::Recorded(sample))
}
