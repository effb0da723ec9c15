mod fetch;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use signups_core::{AppConfig, Sample, TimeRange};

#[derive(Debug, Parser)]
#[command(name = "signups-cli")]
#[command(about = "Signup tracker command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Fetch the current count once and record it
    Fetch {
        /// Append to a delimited file instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Fetch and print the count without recording it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print summary statistics and the completion estimate
    Stats {
        /// Read the series from a delimited file instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Restrict the series to a window (all, 7d, 24h)
        #[arg(long, default_value_t = TimeRange::All)]
        range: TimeRange,
        /// Override the configured signup goal
        #[arg(long)]
        target: Option<i64>,
    },
    /// Print the resampled chart buckets
    Chart {
        /// Read the series from a delimited file instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Restrict the series to a window (all, 7d, 24h)
        #[arg(long, default_value_t = TimeRange::All)]
        range: TimeRange,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await,
        Some(Commands::Fetch { csv, dry_run }) => {
            let config = load_config(csv.is_some() || dry_run)?;
            fetch::run_fetch(&config, csv.as_deref(), dry_run).await
        }
        Some(Commands::Stats { csv, range, target }) => {
            let config = load_config(csv.is_some())?;
            let target = target.unwrap_or(config.target);
            if target <= 0 {
                anyhow::bail!("--target must be greater than zero");
            }
            let series = load_series(&config, csv.as_deref(), range).await?;
            print!(
                "{}",
                report::render_stats(&series, range, target, chrono::Utc::now())
            );
            Ok(())
        }
        Some(Commands::Chart { csv, range }) => {
            let config = load_config(csv.is_some())?;
            let series = load_series(&config, csv.as_deref(), range).await?;
            print!("{}", report::render_chart(&series, range));
            Ok(())
        }
        None => {
            println!("signups-cli: no command given (try --help)");
            Ok(())
        }
    }
}

/// Commands that never open the database do not need `DATABASE_URL`.
fn load_config(offline: bool) -> anyhow::Result<AppConfig> {
    let config = if offline {
        signups_core::load_offline_app_config()?
    } else {
        signups_core::load_app_config()?
    };
    Ok(config)
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = signups_db::PoolConfig::from_app_config(config);
    let pool = signups_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let config = load_config(false)?;
    let pool = connect(&config).await?;
    match command {
        DbCommands::Ping => {
            signups_db::health_check(&pool).await?;
            println!("database: ok");
        }
        DbCommands::Migrate => {
            let applied = signups_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

/// Load the series from `csv` when given, otherwise from the database, and
/// cut it to `range`.
async fn load_series(
    config: &AppConfig,
    csv: Option<&std::path::Path>,
    range: TimeRange,
) -> anyhow::Result<Vec<Sample>> {
    let series = if let Some(path) = csv {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        signups_core::delimited::parse_series(&text)
    } else {
        let pool = connect(config).await?;
        signups_db::list_samples(&pool).await?
    };
    Ok(range.filter(&series, chrono::Utc::now()))
}
