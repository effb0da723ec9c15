//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring ingestion job.

use std::sync::Arc;

use signups_fetcher::{IngestError, IngestOutcome};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::ingest::IngestContext;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    ingest: Arc<IngestContext>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_ingest_job(&scheduler, ingest, cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the signup-count ingestion job on `cron`.
async fn register_ingest_job(
    scheduler: &JobScheduler,
    ingest: Arc<IngestContext>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let ingest = Arc::clone(&ingest);

        Box::pin(async move {
            tracing::debug!(source = ingest.source_url(), "scheduler: starting ingestion tick");
            log_outcome(&ingest.run().await);
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered ingestion job");
    Ok(())
}

/// A failed tick is logged and the next one proceeds as scheduled.
fn log_outcome(result: &Result<IngestOutcome, IngestError>) {
    match result {
        Ok(IngestOutcome::Recorded(sample)) => tracing::info!(
            count = sample.count,
            timestamp = %sample.timestamp,
            "scheduler: ingestion tick recorded sample"
        ),
        Ok(IngestOutcome::BelowMinimum { count, min_count }) => tracing::info!(
            count,
            min_count,
            "scheduler: ingestion tick skipped write below minimum"
        ),
        Err(IngestError::Fetch(e)) => {
            tracing::error!(error = %e, "scheduler: ingestion tick failed to fetch count");
        }
        Err(IngestError::Store(e)) => {
            tracing::error!(error = %e, "scheduler: ingestion tick failed to store sample");
        }
    }
}
