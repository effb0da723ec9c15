use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_SOURCE_URL: &str = "https://moonshot.hackclub.com/api/stats/count";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load configuration for commands that only work with delimited files.
///
/// Same as [`load_app_config`] except that an unset `DATABASE_URL` is
/// accepted and left empty.
///
/// # Errors
///
/// Returns `ConfigError` if any value that is present is invalid.
pub fn load_offline_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_offline_app_config(|key| std::env::var(key))
}

fn build_offline_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    build_app_config(|key| match lookup(key) {
        Err(std::env::VarError::NotPresent) if key == "DATABASE_URL" => Ok(String::new()),
        other => other,
    })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment
/// so tests can drive it from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let positive = |var: &str, value: u64| -> Result<u64, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SIGNUPS_ENV", "development"))?;

    let bind_addr: SocketAddr =
        parse_as("SIGNUPS_BIND_ADDR", &or_default("SIGNUPS_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("SIGNUPS_LOG_LEVEL", "info");

    let db_max_connections: u32 = parse_as(
        "SIGNUPS_DB_MAX_CONNECTIONS",
        &or_default("SIGNUPS_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_as(
        "SIGNUPS_DB_MIN_CONNECTIONS",
        &or_default("SIGNUPS_DB_MIN_CONNECTIONS", "1"),
    )?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "SIGNUPS_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "must not exceed SIGNUPS_DB_MAX_CONNECTIONS ({db_max_connections})"
            ),
        });
    }
    let db_acquire_timeout_secs: u64 = parse_as(
        "SIGNUPS_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("SIGNUPS_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let source_url = or_default("SIGNUPS_SOURCE_URL", DEFAULT_SOURCE_URL);
    let fetch_timeout_secs = positive(
        "SIGNUPS_FETCH_TIMEOUT_SECS",
        parse_as(
            "SIGNUPS_FETCH_TIMEOUT_SECS",
            &or_default("SIGNUPS_FETCH_TIMEOUT_SECS", "20"),
        )?,
    )?;
    let fetch_user_agent = or_default("SIGNUPS_FETCH_USER_AGENT", "signups-tracker/0.1");
    let fetch_max_retries: u32 = parse_as(
        "SIGNUPS_FETCH_MAX_RETRIES",
        &or_default("SIGNUPS_FETCH_MAX_RETRIES", "2"),
    )?;
    let fetch_retry_backoff_ms: u64 = parse_as(
        "SIGNUPS_FETCH_RETRY_BACKOFF_MS",
        &or_default("SIGNUPS_FETCH_RETRY_BACKOFF_MS", "1000"),
    )?;
    let fetch_cron = or_default("SIGNUPS_FETCH_CRON", "0 * * * * *");

    let min_count: i64 = parse_as("SIGNUPS_MIN_COUNT", &or_default("SIGNUPS_MIN_COUNT", "0"))?;
    let target: i64 = parse_as("SIGNUPS_TARGET", &or_default("SIGNUPS_TARGET", "5000"))?;
    if target <= 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SIGNUPS_TARGET".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let refresh_interval_secs = positive(
        "SIGNUPS_REFRESH_INTERVAL_SECS",
        parse_as(
            "SIGNUPS_REFRESH_INTERVAL_SECS",
            &or_default("SIGNUPS_REFRESH_INTERVAL_SECS", "60"),
        )?,
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        source_url,
        fetch_timeout_secs,
        fetch_user_agent,
        fetch_max_retries,
        fetch_retry_backoff_ms,
        fetch_cron,
        min_count,
        target,
        refresh_interval_secs,
    })
}

/// Parse `raw` as `T`, reporting failures against `var`.
fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SIGNUPS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
