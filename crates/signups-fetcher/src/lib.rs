pub mod client;
pub mod error;
pub mod ingest;
pub mod retry;

pub use client::CountClient;
pub use error::{FetchError, IngestError, StoreError};
pub use ingest::{
    fetch_with_retry, ingest_once, CsvSink, IngestOptions, IngestOutcome, PgSink, SampleSink,
};
pub use retry::retry_with_backoff;
