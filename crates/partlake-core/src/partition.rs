//! Date-bucket arithmetic for time-partitioned tables
//!
//! Two Hive-style layouts are supported:
//! - `year={year}/month={month}/day={day}/hour={hour}/`
//! - `dt={year}-{month}-{day}/hour={hour}/`
//!
//! All values are taken from the UTC representation of an instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LakeError, Result};

/// Partition key scheme of a table family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionLayout {
    /// `year=YYYY/month=MM/day=DD/hour=HH/`
    #[default]
    Hive,
    /// `dt=YYYY-MM-DD/hour=HH/`
    DateHour,
}

impl std::fmt::Display for PartitionLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionLayout::Hive => write!(f, "hive"),
            PartitionLayout::DateHour => write!(f, "date-hour"),
        }
    }
}

impl std::str::FromStr for PartitionLayout {
    type Err = LakeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hive" | "year-month-day-hour" => Ok(PartitionLayout::Hive),
            "date-hour" | "dt" | "dt-hour" => Ok(PartitionLayout::DateHour),
            _ => Err(LakeError::invalid_input(format!(
                "unsupported partition layout: {}. Supported: hive, date-hour",
                s
            ))),
        }
    }
}

/// One hour bucket of a UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HourlyPartition {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl HourlyPartition {
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
            hour: instant.hour(),
        }
    }

    /// Partition of `instant` shifted by `hours` (negative looks back).
    pub fn offset_from(instant: DateTime<Utc>, hours: i64) -> Result<Self> {
        let out_of_range =
            || LakeError::invalid_input(format!("{} shifted by {}h is out of range", instant, hours));
        let shifted = Duration::try_hours(hours)
            .and_then(|offset| instant.checked_add_signed(offset))
            .ok_or_else(out_of_range)?;
        Ok(Self::from_datetime(shifted))
    }

    /// Parse a `dth` argument such as `2021-01-01T00`.
    ///
    /// Full RFC 3339 timestamps are accepted too; minutes and seconds are
    /// dropped by the bucketing.
    pub fn parse_dth(dth: &str) -> Result<Self> {
        parse_dth(dth).map(Self::from_datetime)
    }

    pub fn year(&self) -> String {
        format!("{:04}", self.year)
    }

    pub fn month(&self) -> String {
        format!("{:02}", self.month)
    }

    pub fn day(&self) -> String {
        format!("{:02}", self.day)
    }

    pub fn hour(&self) -> String {
        format!("{:02}", self.hour)
    }

    /// `YYYY-MM-DD`
    pub fn date(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    pub fn daily(&self) -> DailyPartition {
        DailyPartition {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }

    /// Name/value pairs in partition-column order for the given layout.
    pub fn columns(&self, layout: PartitionLayout) -> Vec<(&'static str, String)> {
        match layout {
            PartitionLayout::Hive => vec![
                ("year", self.year()),
                ("month", self.month()),
                ("day", self.day()),
                ("hour", self.hour()),
            ],
            PartitionLayout::DateHour => vec![("dt", self.date()), ("hour", self.hour())],
        }
    }

    /// Object key prefix, always ending in `/`.
    pub fn key_prefix(&self, layout: PartitionLayout) -> String {
        self.columns(layout)
            .into_iter()
            .map(|(name, value)| format!("{}={}/", name, value))
            .collect()
    }
}

/// One day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DailyPartition {
    year: i32,
    month: u32,
    day: u32,
}

impl DailyPartition {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// The UTC day before `instant`.
    pub fn yesterday(instant: DateTime<Utc>) -> Result<Self> {
        HourlyPartition::offset_from(instant, -24).map(|p| p.daily())
    }

    /// Parse a `dt` argument such as `2021-01-01`.
    pub fn parse_dt(dt: &str) -> Result<Self> {
        NaiveDate::parse_from_str(dt.trim(), "%Y-%m-%d")
            .map(Self::from_date)
            .map_err(|e| LakeError::invalid_input(format!("invalid dt '{}': {}", dt, e)))
    }

    pub fn year(&self) -> String {
        format!("{:04}", self.year)
    }

    pub fn month(&self) -> String {
        format!("{:02}", self.month)
    }

    pub fn day(&self) -> String {
        format!("{:02}", self.day)
    }

    /// `YYYY-MM-DD`
    pub fn date(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Parse `YYYY-MM-DDTHH` (or an RFC 3339 instant) into a UTC instant.
pub fn parse_dth(dth: &str) -> Result<DateTime<Utc>> {
    let trimmed = dth.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(&format!("{}:00:00", trimmed), "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            LakeError::invalid_input(format!(
                "invalid dth '{}': expected YYYY-MM-DDTHH such as 2021-01-01T00",
                dth
            ))
        })
}
