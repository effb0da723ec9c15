pub mod app_config;
pub mod config;
pub mod delimited;
pub mod projection;
pub mod resample;
pub mod sample;
pub mod time_range;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, load_offline_app_config};
pub use projection::{minutes_since, progress, project, Progress, Stats};
pub use resample::{resample, resample_with_width, value_at_index, Bucket, BucketWidth};
pub use sample::{LiveCount, Sample};
pub use time_range::TimeRange;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
