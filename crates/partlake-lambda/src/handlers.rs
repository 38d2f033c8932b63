use std::fmt;
use std::sync::Arc;

use aws_lambda_events::event::s3::S3Event;
use chrono::{DateTime, Utc};
use partlake_config::{FunctionKind, LakeConfig, MoverConfig};
use partlake_core::{LakeError, PartitionLayout, Result};
use partlake_handlers::{
    create_partitions, move_access_logs, records_from_s3_event, transform_missing,
    transform_partition, FunctionContext,
};
use partlake_query::{AthenaEngine, QueryRunner};
use partlake_storage::{ObjectStore, S3ObjectStore};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Optional overrides carried by a scheduled (EventBridge) invocation.
///
/// Every other field of the event is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScheduledEvent {
    #[serde(default)]
    pub dth: Option<String>,
    #[serde(default)]
    pub dt: Option<String>,
}

impl ScheduledEvent {
    pub fn from_payload(payload: Value) -> Result<Self> {
        if payload.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(payload)
            .map_err(|e| LakeError::invalid_input(format!("invalid scheduled event: {}", e)))
    }
}

/// Functions driven by a schedule rather than by object notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledFunction {
    CreatePartitions,
    TransformPartition,
    TransformMissing,
}

impl ScheduledFunction {
    pub fn kind(self) -> FunctionKind {
        match self {
            Self::CreatePartitions => FunctionKind::CreatePartitions,
            Self::TransformPartition => FunctionKind::TransformPartition,
            Self::TransformMissing => FunctionKind::TransformMissing,
        }
    }
}

/// The deployed function and the clients it runs with.
pub enum LambdaState {
    Scheduled {
        function: ScheduledFunction,
        ctx: FunctionContext,
    },
    Mover {
        store: Arc<dyn ObjectStore>,
        prefix: String,
        layout: PartitionLayout,
    },
}

impl LambdaState {
    /// Validate the configuration for the selected function and build its
    /// AWS clients.
    pub async fn from_config(config: &LakeConfig) -> anyhow::Result<Self> {
        let function = config.require_function()?;
        config.validate_for(function)?;

        let function = match function {
            FunctionKind::CreatePartitions => ScheduledFunction::CreatePartitions,
            FunctionKind::TransformPartition => ScheduledFunction::TransformPartition,
            FunctionKind::TransformMissing => ScheduledFunction::TransformMissing,
            FunctionKind::MoveAccessLogs => {
                let store = Arc::new(S3ObjectStore::from_env().await);
                return Ok(Self::mover(store, &config.mover));
            }
        };

        let engine = Arc::new(AthenaEngine::from_env().await);
        let runner = QueryRunner::from_config(engine, &config.query);
        Ok(Self::Scheduled {
            function,
            ctx: FunctionContext::new(Arc::new(runner), config),
        })
    }

    pub fn mover(store: Arc<dyn ObjectStore>, config: &MoverConfig) -> Self {
        Self::Mover {
            store,
            prefix: config.target_key_prefix.clone(),
            layout: config.layout,
        }
    }

    pub fn function(&self) -> FunctionKind {
        match self {
            Self::Scheduled { function, .. } => function.kind(),
            Self::Mover { .. } => FunctionKind::MoveAccessLogs,
        }
    }
}

impl fmt::Debug for LambdaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaState")
            .field("function", &self.function())
            .finish_non_exhaustive()
    }
}

/// Run the deployed function for one event. Success returns `null`.
pub async fn handle_event(state: &LambdaState, payload: Value, now: DateTime<Utc>) -> Result<Value> {
    match state {
        LambdaState::Scheduled { function, ctx } => {
            let event = ScheduledEvent::from_payload(payload)?;
            let outcome = match function {
                ScheduledFunction::CreatePartitions => {
                    create_partitions(ctx, now, event.dth.as_deref()).await?
                }
                ScheduledFunction::TransformPartition => {
                    transform_partition(ctx, now, event.dth.as_deref()).await?
                }
                ScheduledFunction::TransformMissing => {
                    transform_missing(ctx, now, event.dt.as_deref()).await?
                }
            };
            info!(
                query_id = %outcome.handle,
                polls = outcome.polls,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Invocation finished"
            );
        }
        LambdaState::Mover {
            store,
            prefix,
            layout,
        } => {
            let event: S3Event = serde_json::from_value(payload)
                .map_err(|e| LakeError::invalid_input(format!("invalid S3 event: {}", e)))?;
            let records = records_from_s3_event(&event);
            move_access_logs(store.as_ref(), prefix, *layout, &records)
                .await
                .into_result()?;
        }
    }
    Ok(Value::Null)
}
