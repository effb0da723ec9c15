//! One-shot ingestion for the `fetch` command.

use std::path::Path;

use chrono::Utc;
use signups_core::AppConfig;
use signups_fetcher::{
    fetch_with_retry, ingest_once, CountClient, CsvSink, IngestOptions, IngestOutcome, PgSink,
};

/// Fetch the current count and record it in `csv`, or in the database when
/// no file is given.
///
/// With `dry_run` the count is fetched and printed but never written.
///
/// # Errors
///
/// Returns an error if the client cannot be built, the fetch fails after
/// retries, or the write is rejected.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    csv: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let client = CountClient::from_app_config(config)?;
    let options = IngestOptions::from_app_config(config);

    if dry_run {
        let count = fetch_with_retry(&client, &options).await?;
        println!(
            "dry-run: fetched count {count} from {}; nothing recorded",
            client.url()
        );
        return Ok(());
    }

    let outcome = if let Some(path) = csv {
        ingest_once(&client, &CsvSink::new(path), &options, Utc::now()).await?
    } else {
        let pool = crate::connect(config).await?;
        ingest_once(&client, &PgSink::new(pool), &options, Utc::now()).await?
    };

    println!("{}", describe_outcome(&outcome));
    Ok(())
}

fn describe_outcome(outcome: &IngestOutcome) -> String {
    match outcome {
        IngestOutcome::Recorded(sample) => format!(
            "recorded count {} at {}",
            sample.count,
            sample
                .timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ),
        IngestOutcome::BelowMinimum { count, min_count } => {
            format!("fetched count {count} is below the minimum of {min_count}; not recorded")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use signups_core::Sample;

    #[test]
    fn describes_recorded_sample() {
        let sample = Sample::new(Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 5).unwrap(), 812);
        assert_eq!(
            describe_outcome(&IngestOutcome::Recorded(sample)),
            "recorded count 812 at 2025-09-01T12:00:05Z"
        );
    }

    #[test]
    fn describes_skipped_sample() {
        let text = describe_outcome(&IngestOutcome::BelowMinimum {
            count: 3,
            min_count: 100,
        });
        assert!(text.contains("below the minimum of 100"), "got {text}");
    }
}
