//! Scheduled partition maintenance
//!
//! Each function computes its target partition from the invocation time
//! unless an explicit `dth`/`dt` is given, builds one statement and runs it
//! to completion. Engine errors propagate unchanged.

use chrono::{DateTime, Utc};
use partlake_core::{sql, DailyPartition, HourlyPartition, Result};
use partlake_query::QueryOutcome;
use tracing::info;

use crate::context::FunctionContext;

/// Register the partition `lookahead_hours` after `now` (or of `dth`).
pub async fn create_partitions(
    ctx: &FunctionContext,
    now: DateTime<Utc>,
    dth: Option<&str>,
) -> Result<QueryOutcome> {
    let partition = match dth {
        Some(dth) => HourlyPartition::parse_dth(dth)?,
        None => HourlyPartition::offset_from(now, ctx.schedule().lookahead_hours)?,
    };
    let layout = ctx.tables().layout;
    let table = ctx.table(&ctx.tables().table)?;

    info!(
        table = %table,
        partition = %partition.key_prefix(layout),
        "Creating partition"
    );
    ctx.runner()
        .run_query(&sql::add_partition(&table, &partition, layout))
        .await
}

/// Copy the partition `lookback_hours` before `now` (or of `dth`) from the
/// source table into the target table.
pub async fn transform_partition(
    ctx: &FunctionContext,
    now: DateTime<Utc>,
    dth: Option<&str>,
) -> Result<QueryOutcome> {
    let partition = match dth {
        Some(dth) => HourlyPartition::parse_dth(dth)?,
        None => HourlyPartition::offset_from(now, ctx.schedule().lookback_hours.saturating_neg())?,
    };
    let layout = ctx.tables().layout;
    let source = ctx.table(&ctx.tables().source_table)?;
    let target = ctx.table(&ctx.tables().target_table)?;

    info!(
        source = %source,
        target = %target,
        partition = %partition.key_prefix(layout),
        "Transforming partition"
    );
    ctx.runner()
        .run_query(&sql::insert_partition(&source, &target, &partition, layout))
        .await
}

/// Backfill rows of yesterday (or of `dt`) that the hourly transform missed.
pub async fn transform_missing(
    ctx: &FunctionContext,
    now: DateTime<Utc>,
    dt: Option<&str>,
) -> Result<QueryOutcome> {
    let day = match dt {
        Some(dt) => DailyPartition::parse_dt(dt)?,
        None => DailyPartition::yesterday(now)?,
    };
    let layout = ctx.tables().layout;
    let source = ctx.table(&ctx.tables().source_table)?;
    let target = ctx.table(&ctx.tables().target_table)?;

    info!(source = %source, target = %target, dt = %day.date(), "Inserting missing rows");
    ctx.runner()
        .run_query(&sql::insert_missing_rows(&source, &target, &day, layout))
        .await
}
