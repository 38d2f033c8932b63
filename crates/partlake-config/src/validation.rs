// Configuration validation
//
// Shared settings are checked at load time. Table names and locations are
// only required by some functions, so they are checked per function.

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

/// One year
const MAX_SCHEDULE_OFFSET_HOURS: u64 = 24 * 365;

pub fn validate_config(config: &LakeConfig) -> Result<()> {
    validate_query_config(&config.query)?;
    validate_schedule_config(&config.schedule)?;

    if let Some(ref log) = config.log {
        if log.level.trim().is_empty() {
            bail!("log.level must not be empty");
        }
    }

    Ok(())
}

pub fn validate_for_function(config: &LakeConfig, function: FunctionKind) -> Result<()> {
    validate_config(config)?;

    match function {
        FunctionKind::CreatePartitions => {
            require_query_target(&config.query)?;
            require("tables.table", &config.tables.table)?;
        }
        FunctionKind::TransformPartition | FunctionKind::TransformMissing => {
            require_query_target(&config.query)?;
            require("tables.source_table", &config.tables.source_table)?;
            require("tables.target_table", &config.tables.target_table)?;
            if config.tables.source_table == config.tables.target_table {
                bail!("tables.source_table and tables.target_table must differ");
            }
        }
        FunctionKind::MoveAccessLogs => {
            let prefix = &config.mover.target_key_prefix;
            if prefix.starts_with('/') {
                bail!("mover.target_key_prefix must not start with '/'");
            }
            if !prefix.is_empty() && !prefix.ends_with('/') {
                bail!("mover.target_key_prefix must end with '/'");
            }
        }
    }

    Ok(())
}

fn validate_query_config(config: &QueryConfig) -> Result<()> {
    if config.poll_interval_ms == 0 {
        bail!("query.poll_interval_ms must be greater than 0");
    }

    if config.poll_interval_ms > 60_000 {
        warn!(
            poll_interval_ms = config.poll_interval_ms,
            "query.poll_interval_ms is very large; short queries will wait a long time"
        );
    }

    if let Some(max_wait) = config.max_wait() {
        if max_wait < config.poll_interval() {
            bail!("query.max_wait_secs must be at least one poll interval (or 0 to disable)");
        }
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<()> {
    for (name, hours) in [
        ("schedule.lookahead_hours", config.lookahead_hours),
        ("schedule.lookback_hours", config.lookback_hours),
    ] {
        if hours.unsigned_abs() > MAX_SCHEDULE_OFFSET_HOURS {
            bail!(
                "{} must be within ±{} hours, got {}",
                name,
                MAX_SCHEDULE_OFFSET_HOURS,
                hours
            );
        }
    }

    if config.lookahead_hours.abs() > 24 * 7 || config.lookback_hours.abs() > 24 * 7 {
        warn!(
            lookahead_hours = config.lookahead_hours,
            lookback_hours = config.lookback_hours,
            "schedule offsets exceed one week"
        );
    }
    Ok(())
}

fn require_query_target(config: &QueryConfig) -> Result<()> {
    require("query.database", &config.database)?;
    require("query.output_location", &config.output_location)?;
    if !config.output_location.starts_with("s3://") {
        bail!(
            "query.output_location must be an s3:// URL, got '{}'",
            config.output_location
        );
    }
    Ok(())
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} is required", name);
    }
    Ok(())
}
