use super::{LakeConfig, LogConfig, LogFormat};
use anyhow::{anyhow, Context, Result};
use partlake_core::PartitionLayout;

pub const ENV_PREFIX: &str = "PARTLAKE_";

/// Abstraction over environment-variable lookups so tests and embedding
/// runtimes can supply their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the PARTLAKE_ prefix
    /// Used for the deployment variables (DATABASE, TABLE, ...)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides to the config.
///
/// Unprefixed deployment variables are applied first so that `PARTLAKE_*`
/// variables win when both are set.
pub fn apply_env_overrides<E: EnvSource>(config: &mut LakeConfig, env: &E) -> Result<()> {
    // Deployment variables (as set by the function templates)
    if let Some(database) = get_raw_env_string(env, "DATABASE") {
        config.query.database = database;
    }
    if let Some(location) = get_raw_env_string(env, "ATHENA_QUERY_RESULTS_LOCATION") {
        config.query.output_location = location;
    }
    if let Some(table) = get_raw_env_string(env, "TABLE") {
        config.tables.table = table;
    }
    if let Some(table) = get_raw_env_string(env, "SOURCE_TABLE") {
        config.tables.source_table = table;
    }
    if let Some(table) = get_raw_env_string(env, "TARGET_TABLE") {
        config.tables.target_table = table;
    }
    if let Some(prefix) = get_raw_env_string(env, "TARGET_KEY_PREFIX") {
        config.mover.target_key_prefix = normalize_prefix(prefix);
    }

    // Function selection
    if let Some(function) = get_env_string(env, "FUNCTION") {
        config.function = Some(
            function
                .parse()
                .with_context(|| format!("Invalid {}FUNCTION value", ENV_PREFIX))?,
        );
    }

    // Query configuration
    if let Some(database) = get_env_string(env, "DATABASE") {
        config.query.database = database;
    }
    if let Some(location) = get_env_string(env, "OUTPUT_LOCATION") {
        config.query.output_location = location;
    }
    if let Some(workgroup) = get_env_string(env, "WORKGROUP") {
        config.query.workgroup = if workgroup.is_empty() {
            None
        } else {
            Some(workgroup)
        };
    }
    if let Some(val) = get_env_u64(env, "POLL_INTERVAL_MS")? {
        config.query.poll_interval_ms = val;
    }
    if let Some(val) = get_env_u64(env, "MAX_WAIT_SECS")? {
        config.query.max_wait_secs = val;
    }

    // Tables
    if let Some(table) = get_env_string(env, "TABLE") {
        config.tables.table = table;
    }
    if let Some(table) = get_env_string(env, "SOURCE_TABLE") {
        config.tables.source_table = table;
    }
    if let Some(table) = get_env_string(env, "TARGET_TABLE") {
        config.tables.target_table = table;
    }
    if let Some(layout) = get_env_layout(env, "PARTITION_LAYOUT")? {
        config.tables.layout = layout;
    }

    // Schedule
    if let Some(val) = get_env_i64(env, "LOOKAHEAD_HOURS")? {
        config.schedule.lookahead_hours = val;
    }
    if let Some(val) = get_env_i64(env, "LOOKBACK_HOURS")? {
        config.schedule.lookback_hours = val;
    }

    // Mover
    if let Some(prefix) = get_env_string(env, "TARGET_KEY_PREFIX") {
        config.mover.target_key_prefix = normalize_prefix(prefix);
    }
    if let Some(layout) = get_env_layout(env, "MOVER_LAYOUT")? {
        config.mover.layout = layout;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        ensure_log(config).level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        let parsed = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
        ensure_log(config).format = parsed;
    }

    Ok(())
}

fn ensure_log(config: &mut LakeConfig) -> &mut LogConfig {
    config.log.get_or_insert_with(LogConfig::default)
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

/// Get a raw environment variable without the PARTLAKE_ prefix
fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get_raw(key)
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_i64<E: EnvSource>(env: &E, key: &str) -> Result<Option<i64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<i64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_layout<E: EnvSource>(env: &E, key: &str) -> Result<Option<PartitionLayout>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<PartitionLayout>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn normalize_prefix(prefix: String) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix
    } else {
        format!("{}/", prefix)
    }
}
