mod api;
mod ingest;
mod live;
mod middleware;
mod refresh;
mod scheduler;

use std::{sync::Arc, time::Duration};

use signups_fetcher::{CountClient, IngestOptions, PgSink};
use tokio::sync::{watch, Notify};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    ingest::IngestContext,
    refresh::SnapshotStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(signups_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, config = ?config, "starting signups-server");

    let pool_config = signups_db::PoolConfig::from_app_config(&config);
    let pool = signups_db::connect_pool(&config.database_url, pool_config).await?;
    signups_db::run_migrations(&pool).await?;

    let ingest = Arc::new(IngestContext::new(
        CountClient::from_app_config(&config)?,
        Arc::new(PgSink::new(pool.clone())),
        IngestOptions::from_app_config(&config),
    ));
    let _scheduler = scheduler::build_scheduler(Arc::clone(&ingest), &config.fetch_cron).await?;

    let snapshots = SnapshotStore::default();
    match refresh::refresh_once(&pool, &snapshots).await {
        Ok(samples) => tracing::info!(samples, "refresh: initial snapshot loaded"),
        Err(e) => tracing::error!(error = %e, "refresh: initial snapshot failed"),
    }

    let initial_live = signups_db::latest_sample(&pool)
        .await?
        .map(signups_core::LiveCount::from);
    let (live_tx, live_rx) = watch::channel(initial_live);
    let refresh_trigger = Arc::new(Notify::new());

    let _refresh_task = refresh::spawn_refresh_loop(
        pool.clone(),
        snapshots.clone(),
        Arc::clone(&refresh_trigger),
        Duration::from_secs(config.refresh_interval_secs),
    );
    let _live_task = live::spawn_live_listener(pool.clone(), live_tx, refresh_trigger);

    let app = build_app(
        AppState {
            pool,
            snapshots,
            live: live_rx,
            ingest,
            target: config.target,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
