use std::sync::Arc;

use chrono::Utc;
use signups_fetcher::{
    ingest_once, CountClient, IngestError, IngestOptions, IngestOutcome, SampleSink,
};

/// Everything one ingestion tick needs, shared by the scheduler and the
/// on-demand `POST /api/v1/ingest` route.
#[derive(Clone)]
pub struct IngestContext {
    client: CountClient,
    sink: Arc<dyn SampleSink>,
    options: IngestOptions,
}

impl IngestContext {
    #[must_use]
    pub fn new(client: CountClient, sink: Arc<dyn SampleSink>, options: IngestOptions) -> Self {
        Self {
            client,
            sink,
            options,
        }
    }

    #[must_use]
    pub fn source_url(&self) -> &str {
        self.client.url().as_str()
    }

    /// Runs one tick stamped with the current time.
    ///
    /// # Errors
    ///
    /// Propagates [`IngestError`] from [`ingest_once`].
    pub async fn run(&self) -> Result<IngestOutcome, IngestError> {
        ingest_once(&self.client, self.sink.as_ref(), &self.options, Utc::now()).await
    }
}
