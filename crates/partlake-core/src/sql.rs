//! SQL statements issued through the query runner
//!
//! The runner only transports text; the catalog is mutated by the engine when
//! it executes the DDL below.

use crate::error::{LakeError, Result};
use crate::partition::{DailyPartition, HourlyPartition, PartitionLayout};

/// `database.table`, with both parts restricted to `[A-Za-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    database: String,
    table: String,
}

impl TableRef {
    pub fn new(database: &str, table: &str) -> Result<Self> {
        validate_identifier("database", database)?;
        validate_identifier("table", table)?;
        Ok(Self {
            database: database.to_string(),
            table: table.to_string(),
        })
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LakeError::invalid_input(format!("{} name must not be empty", kind)));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(LakeError::invalid_input(format!(
            "{} name '{}' may only contain letters, digits and underscores",
            kind, name
        )));
    }
    Ok(())
}

fn partition_predicate(partition: &HourlyPartition, layout: PartitionLayout) -> String {
    partition
        .columns(layout)
        .into_iter()
        .map(|(name, value)| format!("{} = '{}'", name, value))
        .collect::<Vec<_>>()
        .join("\n        AND ")
}

/// Register the partition in the catalog; a no-op when it already exists.
pub fn add_partition(table: &TableRef, partition: &HourlyPartition, layout: PartitionLayout) -> String {
    let values = partition
        .columns(layout)
        .into_iter()
        .map(|(name, value)| format!("{} = '{}'", name, value))
        .collect::<Vec<_>>()
        .join(",\n        ");

    format!(
        "ALTER TABLE {table}\n    ADD IF NOT EXISTS\n    PARTITION (\n        {values} );"
    )
}

/// Copy one hourly partition from `source` into `target`.
pub fn insert_partition(
    source: &TableRef,
    target: &TableRef,
    partition: &HourlyPartition,
    layout: PartitionLayout,
) -> String {
    format!(
        "INSERT INTO {target}\n    SELECT *\n    FROM {source}\n    WHERE {predicate};",
        predicate = partition_predicate(partition, layout)
    )
}

/// Insert the rows of `day` present in `source` but missing from `target`.
///
/// Rows are matched on their hour bucket and `request_id`. Both tables use
/// `layout`.
pub fn insert_missing_rows(
    source: &TableRef,
    target: &TableRef,
    day: &DailyPartition,
    layout: PartitionLayout,
) -> String {
    let (predicate, dth, gz_dth) = match layout {
        PartitionLayout::Hive => (
            format!(
                "year = '{}' AND month = '{}' AND day = '{}'",
                day.year(),
                day.month(),
                day.day()
            ),
            "concat(year, '-', month, '-', day, 'T', hour)",
            "concat(gz.year, '-', gz.month, '-', gz.day, 'T', gz.hour)",
        ),
        PartitionLayout::DateHour => (
            format!("dt = '{}'", day.date()),
            "concat(dt, 'T', hour)",
            "concat(gz.dt, 'T', gz.hour)",
        ),
    };
    format!(
        "-- Insert missing rows of {date}
    INSERT INTO {target}
    WITH gz AS (
      SELECT *
      FROM {source}
      WHERE {predicate}
    ), parquet AS (
      SELECT {dth} dth, request_id
      FROM {target}
      WHERE {predicate}
    )
    SELECT
      gz.*
    FROM gz LEFT JOIN parquet
    ON {gz_dth} = parquet.dth
      AND gz.request_id = parquet.request_id
    WHERE parquet.request_id IS NULL",
        date = day.date(),
    )
}
