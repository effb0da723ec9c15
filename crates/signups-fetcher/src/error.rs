use thiserror::Error;

/// Errors returned by the remote count client.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body was not valid JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON body had no usable non-negative integer `count`.
    #[error("invalid count in response from {url}: {reason}")]
    InvalidCount { url: String, reason: String },

    #[error("invalid source URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failure to persist a fetched sample.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] signups_db::DbError),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed ingestion tick. Fetch and store failures stay distinct
/// so callers can report them differently.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
}
