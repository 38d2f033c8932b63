use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use partlake_config::{FunctionKind, LakeConfig};
use partlake_handlers::{FunctionContext, ObjectRef};
use partlake_query::{AthenaEngine, QueryRunner};
use partlake_storage::S3ObjectStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod init;

/// Partition maintenance and access-log relocation for an Athena data lake
#[derive(Parser)]
#[command(name = "partlake")]
#[command(version)]
#[command(about = "Run one partlake function once against AWS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the partition for the next hour
    CreatePartitions {
        /// Partition hour instead of the next one, e.g. 2021-01-01T00
        #[arg(long, value_name = "DTH")]
        dth: Option<String>,
    },
    /// Copy the partition from two hours ago into the target table
    TransformPartition {
        /// Partition hour instead of two hours ago, e.g. 2021-01-01T00
        #[arg(long, value_name = "DTH")]
        dth: Option<String>,
    },
    /// Insert yesterday's rows that are missing from the target table
    #[command(alias = "transform-missing-gz-data-daily")]
    TransformMissing {
        /// Day instead of yesterday, e.g. 2021-01-01
        #[arg(long, value_name = "DT")]
        dt: Option<String>,
    },
    /// Move access log objects into the partitioned prefix
    MoveAccessLogs {
        #[arg(long)]
        bucket: String,

        /// Object key to move (repeatable)
        #[arg(long = "key", value_name = "KEY", required = true)]
        keys: Vec<String>,
    },
}

impl Commands {
    fn function(&self) -> FunctionKind {
        match self {
            Self::CreatePartitions { .. } => FunctionKind::CreatePartitions,
            Self::TransformPartition { .. } => FunctionKind::TransformPartition,
            Self::TransformMissing { .. } => FunctionKind::TransformMissing,
            Self::MoveAccessLogs { .. } => FunctionKind::MoveAccessLogs,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        LakeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        LakeConfig::load().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli);
    init::init_tracing(&config.log_config());

    let function = cli.command.function();
    config
        .validate_for(function)
        .with_context(|| format!("Configuration is incomplete for {}", function))?;
    info!(%function, "Running function");

    let now = Utc::now();
    match cli.command {
        Commands::CreatePartitions { dth } => {
            let ctx = function_context(&config).await;
            let outcome = partlake_handlers::create_partitions(&ctx, now, dth.as_deref()).await?;
            info!(query_id = %outcome.handle, polls = outcome.polls, "Partition created");
        }
        Commands::TransformPartition { dth } => {
            let ctx = function_context(&config).await;
            let outcome = partlake_handlers::transform_partition(&ctx, now, dth.as_deref()).await?;
            info!(query_id = %outcome.handle, polls = outcome.polls, "Partition transformed");
        }
        Commands::TransformMissing { dt } => {
            let ctx = function_context(&config).await;
            let outcome = partlake_handlers::transform_missing(&ctx, now, dt.as_deref()).await?;
            info!(query_id = %outcome.handle, polls = outcome.polls, "Missing rows inserted");
        }
        Commands::MoveAccessLogs { bucket, keys } => {
            let store = S3ObjectStore::from_env().await;
            let records: Vec<ObjectRef> = keys
                .into_iter()
                .map(|key| ObjectRef::new(bucket.clone(), key))
                .collect();
            let report = partlake_handlers::move_access_logs(
                &store,
                &config.mover.target_key_prefix,
                config.mover.layout,
                &records,
            )
            .await
            .into_result()?;
            info!(moved = report.moved(), skipped = report.skipped(), "Access logs moved");
        }
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut LakeConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        let mut log = config.log_config();
        log.level = level.clone();
        config.log = Some(log);
    }
}

async fn function_context(config: &LakeConfig) -> FunctionContext {
    let engine = Arc::new(AthenaEngine::from_env().await);
    let runner = QueryRunner::from_config(engine, &config.query);
    FunctionContext::new(Arc::new(runner), config)
}
