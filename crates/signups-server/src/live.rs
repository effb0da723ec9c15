//! Push path for the current count.
//!
//! Store notifications update a `watch` channel that the SSE route streams
//! from, and wake the refresh loop so chart and stats follow shortly after.

use std::{sync::Arc, time::Duration};

use signups_core::LiveCount;
use sqlx::PgPool;
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Stores `incoming` unless the current value is newer or identical.
///
/// Returns whether the value changed, for use with
/// [`watch::Sender::send_if_modified`].
pub fn apply_live_update(current: &mut Option<LiveCount>, incoming: LiveCount) -> bool {
    match current {
        Some(existing) if existing.timestamp > incoming.timestamp || *existing == incoming => {
            false
        }
        _ => {
            *current = Some(incoming);
            true
        }
    }
}

/// Spawns the notification listener. It reconnects after failures and
/// never returns on its own.
pub fn spawn_live_listener(
    pool: PgPool,
    live: watch::Sender<Option<LiveCount>>,
    refresh: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let mut listener = match signups_db::listen_for_changes(&pool).await {
                Ok(listener) => {
                    tracing::info!(
                        channel = signups_db::CHANGE_CHANNEL,
                        "live: listening for sample notifications"
                    );
                    listener
                }
                Err(e) => {
                    tracing::warn!(error = %e, "live: failed to subscribe; retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };

            loop {
                match listener.recv().await {
                    Ok(update) => {
                        live.send_if_modified(|current| apply_live_update(current, update));
                        refresh.notify_one();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "live: listener connection lost");
                        break;
                    }
                }
            }

            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}
