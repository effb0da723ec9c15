//! Change notifications for newly inserted samples.
//!
//! An `AFTER INSERT` trigger on `signups` publishes `{"count", "timestamp"}`
//! on [`CHANGE_CHANNEL`]. [`SampleListener`] turns those notifications into
//! [`LiveCount`] values. They are a hint that the latest count changed,
//! nothing more: consumers that need the series re-read it in full.

use signups_core::LiveCount;
use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::DbError;

pub const CHANGE_CHANNEL: &str = "signups_changed";

/// Subscription to [`CHANGE_CHANNEL`].
pub struct SampleListener {
    inner: PgListener,
}

/// Opens a dedicated connection and subscribes to [`CHANGE_CHANNEL`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the connection or `LISTEN` fails.
pub async fn listen_for_changes(pool: &PgPool) -> Result<SampleListener, DbError> {
    let mut inner = PgListener::connect_with(pool).await?;
    inner.listen(CHANGE_CHANNEL).await?;
    Ok(SampleListener { inner })
}

impl SampleListener {
    /// Waits for the next well-formed notification.
    ///
    /// Payloads that do not parse are logged and skipped. `PgListener`
    /// reconnects on its own after a dropped connection; notifications sent
    /// while disconnected are lost.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the underlying connection fails and
    /// cannot be re-established.
    pub async fn recv(&mut self) -> Result<LiveCount, DbError> {
        loop {
            let notification = self.inner.recv().await?;
            match parse_notification(notification.payload()) {
                Some(live) => return Ok(live),
                None => tracing::warn!(
                    payload = notification.payload(),
                    "live: ignoring malformed change notification"
                ),
            }
        }
    }
}

/// Parses a notification payload into a [`LiveCount`].
///
/// Returns `None` for anything that is not a JSON object with an integer
/// `count` and an RFC 3339 `timestamp`, or whose count is negative.
#[must_use]
pub fn parse_notification(payload: &str) -> Option<LiveCount> {
    serde_json::from_str::<LiveCount>(payload)
        .ok()
        .filter(|live| live.count >= 0)
}
