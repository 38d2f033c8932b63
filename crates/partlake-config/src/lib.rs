// partlake-config - Unified configuration for every partlake function
//
// Supports configuration from multiple sources:
// 1. PARTLAKE_* environment variables (highest priority)
// 2. Deployment variables without prefix (DATABASE, TABLE, ...)
// 3. Config file path from PARTLAKE_CONFIG env var
// 4. Config file contents from PARTLAKE_CONFIG_CONTENT env var
// 5. Default config file location (./partlake.toml)
// 6. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use partlake_core::PartitionLayout;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod platform;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use platform::Platform;

/// Main configuration, built once at startup and passed to constructors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LakeConfig {
    /// Function the Lambda bootstrap dispatches to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionKind>,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub tables: TablesConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub mover: MoverConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
}

/// The independent functions shipped by partlake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionKind {
    CreatePartitions,
    TransformPartition,
    TransformMissing,
    MoveAccessLogs,
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionKind::CreatePartitions => write!(f, "create-partitions"),
            FunctionKind::TransformPartition => write!(f, "transform-partition"),
            FunctionKind::TransformMissing => write!(f, "transform-missing"),
            FunctionKind::MoveAccessLogs => write!(f, "move-access-logs"),
        }
    }
}

impl std::str::FromStr for FunctionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "create-partitions" | "createpartitions" => Ok(FunctionKind::CreatePartitions),
            "transform-partition" | "transformpartition" => Ok(FunctionKind::TransformPartition),
            "transform-missing"
            | "transform-missing-gz-data-daily"
            | "transformmissinggzdatadaily" => {
                Ok(FunctionKind::TransformMissing)
            }
            "move-access-logs" | "moveaccesslogs" => Ok(FunctionKind::MoveAccessLogs),
            _ => anyhow::bail!(
                "Unsupported function: {}. Supported: create-partitions, transform-partition, transform-missing, move-access-logs",
                s
            ),
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub database: String,

    /// S3 URL the engine writes result artifacts to
    #[serde(default)]
    pub output_location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workgroup: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// 0 disables the bound
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_max_wait_secs() -> u64 {
    840
}

impl QueryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        match self.max_wait_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            output_location: String::new(),
            workgroup: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

/// Catalog tables the functions operate on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    /// Table that receives new partitions
    #[serde(default)]
    pub table: String,

    #[serde(default)]
    pub source_table: String,

    #[serde(default)]
    pub target_table: String,

    #[serde(default)]
    pub layout: PartitionLayout,
}

/// Hour offsets applied to the invocation time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub lookahead_hours: i64,
    pub lookback_hours: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            lookahead_hours: 1,
            lookback_hours: 2,
        }
    }
}

/// Access-log mover configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoverConfig {
    /// Prefix to move partitioned data to, without leading but with trailing slash
    #[serde(default)]
    pub target_key_prefix: String,

    #[serde(default)]
    pub layout: PartitionLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LakeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config(Platform::detect())
    }

    /// Load configuration for a specific platform (useful for testing)
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Construct a config that contains only platform defaults (no env or files).
    pub fn from_platform_defaults(platform: Platform) -> Self {
        let defaults = platform.defaults();
        LakeConfig {
            log: Some(LogConfig {
                level: "info".to_string(),
                format: defaults.log_format,
            }),
            ..LakeConfig::default()
        }
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: LakeConfig) {
        self.query = other.query;
        self.tables = other.tables;
        self.schedule = other.schedule;
        self.mover = other.mover;

        if other.function.is_some() {
            self.function = other.function;
        }
        if other.log.is_some() {
            self.log = other.log;
        }
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration from inline TOML plus overrides supplied by an
    /// `EnvSource`, without touching the host environment or filesystem.
    pub fn load_for_platform_with_env<E: EnvSource>(
        platform: Platform,
        inline_config: Option<&str>,
        env: &E,
    ) -> Result<Self> {
        let mut config = LakeConfig::from_platform_defaults(platform);

        if let Some(inline) = inline_config {
            let file_config: LakeConfig =
                toml::from_str(inline).context("Failed to parse inline config content")?;
            config.merge(file_config);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn log_config(&self) -> LogConfig {
        self.log.clone().unwrap_or_default()
    }

    /// Validate settings shared by every function
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Validate the settings a specific function needs
    pub fn validate_for(&self, function: FunctionKind) -> Result<()> {
        validation::validate_for_function(self, function)
    }

    /// The function selected for this deployment
    pub fn require_function(&self) -> Result<FunctionKind> {
        self.function.ok_or_else(|| {
            anyhow::anyhow!(
                "No function selected; set {}FUNCTION or `function` in the config file",
                ENV_PREFIX
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_kind_from_str() {
        assert_eq!(
            "create-partitions".parse::<FunctionKind>().unwrap(),
            FunctionKind::CreatePartitions
        );
        assert_eq!(
            "transform_partition".parse::<FunctionKind>().unwrap(),
            FunctionKind::TransformPartition
        );
        assert_eq!(
            "transformMissingGzDataDaily".parse::<FunctionKind>().unwrap(),
            FunctionKind::TransformMissing
        );
        assert_eq!(
            "moveAccessLogs".parse::<FunctionKind>().unwrap(),
            FunctionKind::MoveAccessLogs
        );
        assert!("compact".parse::<FunctionKind>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let query = QueryConfig::default();
        assert_eq!(query.poll_interval(), Duration::from_millis(100));
        assert_eq!(query.max_wait(), Some(Duration::from_secs(840)));

        let schedule = ScheduleConfig::default();
        assert_eq!(schedule.lookahead_hours, 1);
        assert_eq!(schedule.lookback_hours, 2);

        assert_eq!(LogConfig::default().format, LogFormat::Text);
    }

    #[test]
    fn test_zero_max_wait_disables_bound() {
        let query = QueryConfig {
            max_wait_secs: 0,
            ..QueryConfig::default()
        };
        assert_eq!(query.max_wait(), None);
    }

    #[test]
    fn test_toml_sections() {
        let config: LakeConfig = toml::from_str(
            r#"
            function = "move-access-logs"

            [query]
            database = "cf_logs"
            output_location = "s3://bucket/athena-query-results"

            [tables]
            table = "partitioned_gz"
            layout = "date-hour"

            [mover]
            target_key_prefix = "partitioned-gz/"
            "#,
        )
        .unwrap();

        assert_eq!(config.function, Some(FunctionKind::MoveAccessLogs));
        assert_eq!(config.query.database, "cf_logs");
        assert_eq!(config.query.poll_interval_ms, 100);
        assert_eq!(config.tables.layout, PartitionLayout::DateHour);
        assert_eq!(config.mover.layout, PartitionLayout::Hive);
        assert!(config.log.is_none());
    }
}
