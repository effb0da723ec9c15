//! Offline unit tests for signups-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::{TimeZone, Utc};
use signups_core::{AppConfig, Environment, Sample};
use signups_db::{parse_notification, rows_to_series, PoolConfig, SampleRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        source_url: "http://localhost/count".to_string(),
        fetch_timeout_secs: 20,
        fetch_user_agent: "ua".to_string(),
        fetch_max_retries: 2,
        fetch_retry_backoff_ms: 1000,
        fetch_cron: "0 * * * * *".to_string(),
        min_count: 0,
        target: 5000,
        refresh_interval_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn sample_row_converts_to_sample() {
    let timestamp = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
    let row = SampleRow {
        id: 1,
        timestamp,
        count: 410,
    };

    assert_eq!(row.to_sample(), Some(Sample::new(timestamp, 410)));
    assert_eq!(rows_to_series(&[row]), vec![Sample::new(timestamp, 410)]);
}

#[test]
fn notification_payload_matches_sample_shape() {
    let timestamp = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
    let payload = serde_json::json!({ "count": 410, "timestamp": timestamp }).to_string();
    let live = parse_notification(&payload).expect("payload");
    assert_eq!(live, Sample::new(timestamp, 410).into());
}
