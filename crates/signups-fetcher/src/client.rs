//! HTTP client for the remote signup-count endpoint.
//!
//! The endpoint answers `GET` with a JSON body `{"count": <integer>}`. Any
//! non-2xx status, a body that is not JSON, or a missing/negative count is
//! a [`FetchError`]; the request as a whole is bounded by the configured
//! timeout.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::FetchError;

/// Client for the signup-count endpoint.
///
/// Constructed once at startup and passed to whatever needs it; there is no
/// shared global instance.
#[derive(Debug, Clone)]
pub struct CountClient {
    client: Client,
    url: Url,
}

impl CountClient {
    /// Creates a client for `url` with a whole-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `url` does not parse, or
    /// [`FetchError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            url: parsed,
        })
    }

    /// Builds a client from the fetch settings in [`signups_core::AppConfig`].
    ///
    /// # Errors
    ///
    /// See [`CountClient::new`].
    pub fn from_app_config(config: &signups_core::AppConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.source_url,
            config.fetch_timeout_secs,
            &config.fetch_user_agent,
        )
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches the current signup count.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Http`] on network failure or timeout.
    /// - [`FetchError::UnexpectedStatus`] on a non-2xx response.
    /// - [`FetchError::Deserialize`] if the body is not JSON.
    /// - [`FetchError::InvalidCount`] if `count` is missing, non-integer, or negative.
    pub async fn fetch_count(&self) -> Result<i64, FetchError> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.text().await?;
        let json: Value = serde_json::from_str(&body).map_err(|e| FetchError::Deserialize {
            context: self.url.to_string(),
            source: e,
        })?;

        extract_count(&json).map_err(|reason| FetchError::InvalidCount {
            url: self.url.to_string(),
            reason,
        })
    }
}

/// Pulls a non-negative integer `count` out of the response body.
///
/// Integral JSON numbers and numeric strings are both accepted.
pub(crate) fn extract_count(body: &Value) -> Result<i64, String> {
    let count = match body.get("count") {
        None | Some(Value::Null) => return Err("missing `count` field".to_owned()),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .and_then(integral_f64_to_i64)
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match count {
        Some(c) if c >= 0 => Ok(c),
        Some(c) => Err(format!("negative count {c}")),
        None => Err(format!("`count` is not an integer: {}", body["count"])),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral_f64_to_i64(value: f64) -> Option<i64> {
    if value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
