//! Amazon Athena implementation of [`QueryEngine`].
//!
//! Credentials and region come from the default AWS provider chain.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use aws_sdk_athena::Client;
use partlake_core::{LakeError, QueryHandle, QueryRequest, QueryState, QueryStatus, Result};
use tracing::debug;

use crate::engine::QueryEngine;

#[derive(Clone, Debug)]
pub struct AthenaEngine {
    client: Client,
}

impl AthenaEngine {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration (env, profile, IAM role).
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl QueryEngine for AthenaEngine {
    async fn start_query(&self, request: &QueryRequest) -> Result<QueryHandle> {
        let mut call = self
            .client
            .start_query_execution()
            .query_string(request.sql())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(request.output_location())
                    .build(),
            );

        if let Some(database) = request.database() {
            call = call.query_execution_context(
                QueryExecutionContext::builder().database(database).build(),
            );
        }
        if let Some(workgroup) = request.workgroup() {
            call = call.work_group(workgroup);
        }

        let output = call
            .send()
            .await
            .map_err(|e| LakeError::submission(DisplayErrorContext(&e).to_string()))?;

        let id = output
            .query_execution_id()
            .ok_or_else(|| LakeError::submission("Athena returned no query execution id"))?;

        Ok(QueryHandle::new(id))
    }

    async fn query_status(&self, handle: &QueryHandle) -> Result<QueryStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(handle.id())
            .send()
            .await
            .map_err(|e| LakeError::Status {
                query_id: handle.id().to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let status = output.query_execution().and_then(|q| q.status());
        let reason = status
            .and_then(|s| s.state_change_reason())
            .map(str::to_string);

        let state = match status.and_then(|s| s.state()) {
            Some(QueryExecutionState::Queued) => QueryState::Queued,
            Some(QueryExecutionState::Running) => QueryState::Running,
            Some(QueryExecutionState::Succeeded) => QueryState::Succeeded,
            Some(QueryExecutionState::Failed) => QueryState::Failed,
            Some(QueryExecutionState::Cancelled) => QueryState::Cancelled,
            other => {
                // Unknown or missing states are polled again
                debug!(query_id = %handle, state = ?other, "Unrecognised query state");
                QueryState::Running
            }
        };

        Ok(QueryStatus { state, reason })
    }
}
