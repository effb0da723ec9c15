//! Shared series snapshot and the loop that keeps it current.
//!
//! Every recompute re-reads the whole series from the store and swaps it in
//! wholesale. Readers clone the `Arc` and work on their own copy, so a
//! refresh never blocks a request for longer than the pointer swap.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use signups_core::Sample;
use sqlx::PgPool;
use tokio::{
    sync::{Notify, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};

/// One full read of the series.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub series: Arc<Vec<Sample>>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn new(series: Vec<Sample>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            series: Arc::new(series),
            fetched_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl SnapshotStore {
    pub async fn current(&self) -> Option<Snapshot> {
        self.inner.read().await.clone()
    }

    /// Replaces the snapshot. The most recent write wins.
    pub async fn replace(&self, snapshot: Snapshot) {
        *self.inner.write().await = Some(snapshot);
    }
}

/// Reads the full series and replaces the snapshot. Returns the sample count.
///
/// # Errors
///
/// Returns [`signups_db::DbError`] if the read fails; the previous snapshot
/// is left in place.
pub async fn refresh_once(
    pool: &PgPool,
    store: &SnapshotStore,
) -> Result<usize, signups_db::DbError> {
    let series = signups_db::list_samples(pool).await?;
    let len = series.len();
    store.replace(Snapshot::new(series, Utc::now())).await;
    Ok(len)
}

/// Spawns the recompute loop.
///
/// Recomputes on every `interval` tick and whenever `trigger` is notified.
/// Triggers that arrive while a recompute is running collapse into one.
pub fn spawn_refresh_loop(
    pool: PgPool,
    store: SnapshotStore,
    trigger: Arc<Notify>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already refreshed.
        ticker.tick().await;

        loop {
            let reason = tokio::select! {
                _ = ticker.tick() => "interval",
                () = trigger.notified() => "notification",
            };

            match refresh_once(&pool, &store).await {
                Ok(samples) => tracing::debug!(reason, samples, "refresh: snapshot replaced"),
                Err(e) => tracing::error!(reason, error = %e, "refresh: failed to reload series"),
            }
        }
    })
}
