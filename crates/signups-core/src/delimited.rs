//! `timestamp,count` delimited text, the file-backed form of a series.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::Sample;

pub const HEADER: &str = "timestamp,count";

/// Parse a delimited series.
///
/// The first non-blank line is a header and is skipped. LF and CRLF line
/// endings are both accepted and blank lines are ignored. Lines with a
/// missing field, a non-integer or negative count, or a timestamp that is
/// not RFC 3339 are dropped. The result is sorted ascending by timestamp;
/// rows sharing a timestamp keep their file order.
#[must_use]
pub fn parse_series(text: &str) -> Vec<Sample> {
    let mut samples: Vec<Sample> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .skip(1)
        .filter_map(|line| {
            let parsed = parse_row(line);
            if parsed.is_none() {
                tracing::debug!(line, "delimited: dropping malformed row");
            }
            parsed
        })
        .collect();

    samples.sort_by_key(|s| s.timestamp);
    samples
}

fn parse_row(line: &str) -> Option<Sample> {
    let mut fields = line.split(',');
    let timestamp = fields.next()?.trim();
    let count = fields.next()?.trim();

    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Utc);
    let count = count.parse::<i64>().ok().filter(|c| *c >= 0)?;

    Some(Sample::new(timestamp, count))
}

/// Render one row, without a trailing newline.
#[must_use]
pub fn format_row(sample: &Sample) -> String {
    format!(
        "{},{}",
        sample.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        sample.count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rows_and_skips_header() {
        let text = "timestamp,count\n2025-09-01T10:00:00Z,410\n2025-09-01T10:05:00Z,415\n";
        let series = parse_series(text);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].count, 410);
        assert_eq!(
            series[1].timestamp,
            Utc.with_ymd_and_hms(2025, 9, 1, 10, 5, 0).unwrap()
        );
    }

    #[test]
    fn accepts_crlf_and_blank_lines() {
        let text = "\r\ntimestamp,count\r\n\r\n2025-09-01T10:00:00Z,410\r\n\r\n2025-09-01T11:00:00+00:00,420\r\n";
        let series = parse_series(text);
        assert_eq!(series.iter().map(|s| s.count).collect::<Vec<_>>(), vec![410, 420]);
    }

    #[test]
    fn drops_malformed_rows() {
        let text = "timestamp,count\n\
                    2025-09-01T10:00:00Z,410\n\
                    not-a-date,411\n\
                    2025-09-01T10:10:00Z,abc\n\
                    2025-09-01T10:15:00Z\n\
                    2025-09-01T10:20:00Z,-5\n\
                    2025-09-01T10:25:00Z,430\n";
        let series = parse_series(text);
        assert_eq!(series.iter().map(|s| s.count).collect::<Vec<_>>(), vec![410, 430]);
    }

    #[test]
    fn sorts_out_of_order_rows() {
        let text = "timestamp,count\n2025-09-02T00:00:00Z,2\n2025-09-01T00:00:00Z,1\n";
        let series = parse_series(text);
        assert_eq!(series.iter().map(|s| s.count).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_series("timestamp,count\n").is_empty());
        assert!(parse_series("").is_empty());
    }

    #[test]
    fn format_row_uses_second_precision_utc() {
        let sample = Sample::new(Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap(), 410);
        assert_eq!(format_row(&sample), "2025-09-01T10:00:00Z,410");
        assert_eq!(parse_series(&format!("{HEADER}\n{}", format_row(&sample))), vec![sample]);
    }
}
