//! Recognition of access-log object keys
//!
//! Log delivery writes files named like `E2ABCDEF.2022-03-04-05.abcdef.gz`.
//! The `YYYY-MM-DD-HH` segment decides which hourly partition the file is
//! moved into:
//! `{prefix}year={year}/month={month}/day={day}/hour={hour}/{filename}`

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Captures, Regex};

use crate::partition::{HourlyPartition, PartitionLayout};

// Groups: year, month, day, hour. Surrounding non-digits keep longer digit
// runs from matching.
const DATE_PATTERN: &str = r"[^\d](\d{4})-(\d{2})-(\d{2})-(\d{2})[^\d]";

fn date_regex() -> &'static Regex {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    DATE_REGEX.get_or_init(|| Regex::new(DATE_PATTERN).expect("date pattern is valid"))
}

/// An object key that carries an hourly timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogKey {
    source_key: String,
    filename: String,
    partition: HourlyPartition,
}

impl AccessLogKey {
    /// The first `YYYY-MM-DD-HH` segment that is a real calendar hour wins.
    /// Returns `None` when the key has no such segment.
    pub fn parse(key: &str) -> Option<Self> {
        let instant = first_valid_hour(key)?;

        let filename = key.rsplit('/').next().unwrap_or(key);
        if filename.is_empty() {
            return None;
        }

        Some(Self {
            source_key: key.to_string(),
            filename: filename.to_string(),
            partition: HourlyPartition::from_datetime(instant),
        })
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn partition(&self) -> &HourlyPartition {
        &self.partition
    }

    /// Destination key under `prefix` (expected to end in `/` or be empty).
    pub fn target_key(&self, prefix: &str, layout: PartitionLayout) -> String {
        format!(
            "{}{}{}",
            prefix,
            self.partition.key_prefix(layout),
            self.filename
        )
    }
}

fn first_valid_hour(key: &str) -> Option<DateTime<Utc>> {
    let mut start = 0;
    while let Some(caps) = date_regex().captures_at(key, start) {
        if let Some(instant) = calendar_hour(&caps) {
            return Some(instant);
        }
        // Neighbouring segments may share a delimiter
        start = caps.get(0)?.start() + 1;
    }
    None
}

fn calendar_hour(caps: &Captures<'_>) -> Option<DateTime<Utc>> {
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;

    Some(
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, 0, 0)?
            .and_utc(),
    )
}

/// Decode an object key as delivered in S3 event notifications.
///
/// Keys are form-encoded there: spaces arrive as `+`, everything else
/// percent-encoded. Undecodable input is returned unchanged.
pub fn decode_event_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_matching_key() {
        let key = AccessLogKey::parse("logs/prefix/2022-03-04-05.abcdef.gz").unwrap();
        assert_eq!(key.filename(), "2022-03-04-05.abcdef.gz");
        assert_eq!(
            key.target_key("<prefix>", PartitionLayout::Hive),
            "<prefix>year=2022/month=03/day=04/hour=05/2022-03-04-05.abcdef.gz"
        );
    }

    #[test]
    fn test_cloudfront_style_name() {
        let key = AccessLogKey::parse("new/E2ABCDEF12345.2019-11-30-23.f1a2b3c4.gz").unwrap();
        assert_eq!(
            key.target_key("partitioned-gz/", PartitionLayout::Hive),
            "partitioned-gz/year=2019/month=11/day=30/hour=23/E2ABCDEF12345.2019-11-30-23.f1a2b3c4.gz"
        );
        assert_eq!(
            key.target_key("partitioned-gz/", PartitionLayout::DateHour),
            "partitioned-gz/dt=2019-11-30/hour=23/E2ABCDEF12345.2019-11-30-23.f1a2b3c4.gz"
        );
    }

    #[test]
    fn test_first_match_wins() {
        let key = AccessLogKey::parse("a/2020-01-02-03/x.2021-04-05-06.gz").unwrap();
        assert_eq!(key.partition().date(), "2020-01-02");
        assert_eq!(key.filename(), "x.2021-04-05-06.gz");
    }

    #[test]
    fn test_invalid_segment_falls_through_to_next() {
        let key = AccessLogKey::parse("x/2022-13-04-05/E2X.2021-04-05-06.gz").unwrap();
        assert_eq!(key.partition().date(), "2021-04-05");
        assert_eq!(key.partition().hour(), "06");

        // segments sharing one delimiter
        let key = AccessLogKey::parse("x/2022-03-04-99-2021-04-05-06.gz").unwrap();
        assert_eq!(key.partition().date(), "2021-04-05");
    }

    #[test]
    fn test_non_matching_keys() {
        assert!(AccessLogKey::parse("logs/prefix/readme.txt").is_none());
        // pattern needs a non-digit on both sides
        assert!(AccessLogKey::parse("2022-03-04-05.gz").is_none());
        assert!(AccessLogKey::parse("x/12022-03-04-05.gz").is_none());
        // impossible calendar values
        assert!(AccessLogKey::parse("x/2022-13-04-05.gz").is_none());
        assert!(AccessLogKey::parse("x/2022-03-04-25.gz").is_none());
        // date segment with no filename after it
        assert!(AccessLogKey::parse("x/2022-03-04-05/").is_none());
    }

    #[test]
    fn test_decode_event_key() {
        assert_eq!(decode_event_key("new/my+log%3D1.gz"), "new/my log=1.gz");
        assert_eq!(decode_event_key("plain/key.gz"), "plain/key.gz");
    }
}
