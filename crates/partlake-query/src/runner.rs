//! Submit-then-poll execution of SQL statements
//!
//! Lifecycle of one run: submit -> handle -> poll (one or more fetches) ->
//! terminal state, timeout or abort -> handle dropped. The runner holds no
//! mutable state, so one instance can serve concurrent invocations.

use std::sync::Arc;
use std::time::Duration;

use partlake_config::QueryConfig;
use partlake_core::{LakeError, QueryHandle, QueryRequest, QueryState, Result};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::QueryEngine;

/// How often to poll and how long to keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the engine reports a terminal state
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_wait: None,
        }
    }
}

/// Observations from a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub handle: QueryHandle,
    /// Status fetches, including the terminal one
    pub polls: usize,
    /// Sleeps between fetches
    pub waits: usize,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct QueryRunner {
    engine: Arc<dyn QueryEngine>,
    output_location: String,
    database: Option<String>,
    workgroup: Option<String>,
    policy: PollPolicy,
}

impl QueryRunner {
    pub fn new(engine: Arc<dyn QueryEngine>, output_location: impl Into<String>) -> Self {
        Self {
            engine,
            output_location: output_location.into(),
            database: None,
            workgroup: None,
            policy: PollPolicy::default(),
        }
    }

    pub fn from_config(engine: Arc<dyn QueryEngine>, config: &QueryConfig) -> Self {
        let database = Some(config.database.clone()).filter(|db| !db.is_empty());
        Self::new(engine, config.output_location.clone())
            .with_database(database)
            .with_workgroup(config.workgroup.clone())
            .with_policy(PollPolicy {
                interval: config.poll_interval(),
                max_wait: config.max_wait(),
            })
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }

    pub fn with_workgroup(mut self, workgroup: Option<String>) -> Self {
        self.workgroup = workgroup;
        self
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit `sql` with the configured output location.
    pub async fn submit(&self, sql: &str) -> Result<QueryHandle> {
        let request = QueryRequest::new(sql, self.output_location.clone())?
            .with_database(self.database.clone())
            .with_workgroup(self.workgroup.clone());

        let handle = self.engine.start_query(&request).await?;
        info!(query_id = %handle, "Submitted query");
        Ok(handle)
    }

    /// Poll until the query reaches a terminal state.
    pub async fn await_completion(&self, handle: &QueryHandle) -> Result<QueryOutcome> {
        self.await_completion_with_cancel(handle, &CancellationToken::new())
            .await
    }

    /// Poll until the query reaches a terminal state or `cancel` fires.
    ///
    /// Cancelling only stops the wait; the query keeps running in the engine.
    pub async fn await_completion_with_cancel(
        &self,
        handle: &QueryHandle,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();
        let mut polls = 0usize;
        let mut waits = 0usize;

        loop {
            let status = self.engine.query_status(handle).await?;
            polls += 1;

            match status.state {
                QueryState::Succeeded => {
                    let elapsed = started.elapsed();
                    info!(
                        query_id = %handle,
                        polls,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Query succeeded"
                    );
                    return Ok(QueryOutcome {
                        handle: handle.clone(),
                        polls,
                        waits,
                        elapsed,
                    });
                }
                QueryState::Failed | QueryState::Cancelled => {
                    let reason = status
                        .reason
                        .unwrap_or_else(|| "no reason reported".to_string());
                    warn!(query_id = %handle, state = %status.state, reason = %reason, "Query did not succeed");
                    return Err(LakeError::Execution {
                        query_id: handle.id().to_string(),
                        state: status.state,
                        reason,
                    });
                }
                QueryState::Queued | QueryState::Running => {
                    debug!(query_id = %handle, state = %status.state, polls, "Query in progress");
                }
            }

            if let Some(max_wait) = self.policy.max_wait {
                let waited = started.elapsed();
                if waited + self.policy.interval > max_wait {
                    warn!(query_id = %handle, polls, "Gave up waiting for query");
                    return Err(LakeError::Timeout {
                        query_id: handle.id().to_string(),
                        waited,
                    });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(query_id = %handle, polls, "Stopped waiting for query");
                    return Err(LakeError::Aborted {
                        query_id: handle.id().to_string(),
                    });
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
            waits += 1;
        }
    }

    /// Run `sql` to completion.
    pub async fn run_query(&self, sql: &str) -> Result<QueryOutcome> {
        let handle = self.submit(sql).await?;
        self.await_completion(&handle).await
    }

    pub async fn run_query_with_cancel(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        let handle = self.submit(sql).await?;
        self.await_completion_with_cancel(&handle, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use partlake_core::QueryStatus;

    fn runner(engine: Arc<ScriptedEngine>, max_wait: Option<Duration>) -> QueryRunner {
        QueryRunner::new(engine, "s3://results/").with_policy(PollPolicy {
            interval: Duration::from_millis(100),
            max_wait,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_first_status_polls_once() {
        let engine = Arc::new(ScriptedEngine::succeeding());
        let outcome = runner(engine.clone(), None).run_query("SELECT 1").await.unwrap();
        assert_eq!(outcome.polls, 1);
        assert_eq!(outcome.waits, 0);
        assert_eq!(engine.status_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_running_succeeded_waits_twice() {
        let engine = Arc::new(ScriptedEngine::with_script(vec![
            QueryStatus::new(QueryState::Queued),
            QueryStatus::new(QueryState::Running),
            QueryStatus::new(QueryState::Succeeded),
        ]));
        let outcome = runner(engine.clone(), None).run_query("SELECT 1").await.unwrap();
        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.waits, 2);
        assert!(outcome.elapsed >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_k_fetches_for_k_minus_one_running() {
        let mut script = vec![QueryStatus::new(QueryState::Running); 6];
        script.push(QueryStatus::new(QueryState::Succeeded));
        let engine = Arc::new(ScriptedEngine::with_script(script));
        let outcome = runner(engine.clone(), None).run_query("SELECT 1").await.unwrap();
        assert_eq!(outcome.polls, 7);
        assert_eq!(outcome.waits, 6);
        assert_eq!(engine.status_fetches(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_query_carries_reason() {
        let engine = Arc::new(ScriptedEngine::with_script(vec![
            QueryStatus::new(QueryState::Running),
            QueryStatus::with_reason(QueryState::Failed, "SYNTAX_ERROR: line 1:1"),
        ]));
        let err = runner(engine, None).run_query("SELEC 1").await.unwrap_err();
        match err {
            LakeError::Execution { state, reason, .. } => {
                assert_eq!(state, QueryState::Failed);
                assert_eq!(reason, "SYNTAX_ERROR: line 1:1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_query_is_an_execution_error() {
        let engine = Arc::new(ScriptedEngine::with_script(vec![QueryStatus::with_reason(
            QueryState::Cancelled,
            "Query cancelled by user",
        )]));
        let err = runner(engine, None).run_query("SELECT 1").await.unwrap_err();
        assert!(matches!(
            err,
            LakeError::Execution {
                state: QueryState::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_error_is_passed_through() {
        let engine = Arc::new(ScriptedEngine::rejecting("ThrottlingException: Rate exceeded"));
        let err = runner(engine.clone(), None).run_query("SELECT 1").await.unwrap_err();
        match err {
            LakeError::Submission { message } => {
                assert_eq!(message, "ThrottlingException: Rate exceeded")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(engine.status_fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_fetch_error_is_not_retried() {
        let engine = Arc::new(
            ScriptedEngine::with_script(vec![
                QueryStatus::new(QueryState::Running),
                QueryStatus::new(QueryState::Succeeded),
            ])
            .fail_status_of("SELECT 1", "InternalServerException: try again"),
        );
        let started = Instant::now();
        let err = runner(engine.clone(), None).run_query("SELECT 1").await.unwrap_err();

        match err {
            LakeError::Status { query_id, message } => {
                assert_eq!(query_id, "query-0001");
                assert_eq!(message, "InternalServerException: try again");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(engine.status_fetches(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sql_never_reaches_engine() {
        let engine = Arc::new(ScriptedEngine::succeeding());
        let err = runner(engine.clone(), None).run_query("   ").await.unwrap_err();
        assert!(matches!(err, LakeError::InvalidInput { .. }));
        assert!(engine.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_expires() {
        let engine = Arc::new(ScriptedEngine::with_script(vec![QueryStatus::new(
            QueryState::Running,
        )]));
        let err = runner(engine.clone(), Some(Duration::from_millis(1050)))
            .run_query("SELECT 1")
            .await
            .unwrap_err();
        match err {
            LakeError::Timeout { waited, .. } => {
                assert!(waited >= Duration::from_secs(1));
                assert!(waited < Duration::from_millis(1050));
            }
            other => panic!("unexpected error: {other}"),
        }
        // 10 waits of 100ms fit in the bound; the 11th fetch observes the deadline
        assert_eq!(engine.status_fetches(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_waiting() {
        let engine = Arc::new(ScriptedEngine::with_script(vec![QueryStatus::new(
            QueryState::Running,
        )]));
        let runner = runner(engine.clone(), None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            trigger.cancel();
        });

        let err = runner
            .run_query_with_cancel("SELECT 1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LakeError::Aborted { .. }));
        assert_eq!(engine.status_fetches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_carries_configuration() {
        let engine = Arc::new(ScriptedEngine::succeeding());
        let config = QueryConfig {
            database: "cf_logs".to_string(),
            output_location: "s3://bucket/athena-query-results".to_string(),
            workgroup: Some("primary".to_string()),
            ..QueryConfig::default()
        };
        let runner = QueryRunner::from_config(engine.clone(), &config);
        runner.run_query("SELECT 1").await.unwrap();

        let submitted = engine.submissions();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].output_location(), "s3://bucket/athena-query-results");
        assert_eq!(submitted[0].database(), Some("cf_logs"));
        assert_eq!(submitted[0].workgroup(), Some("primary"));
        assert_eq!(runner.policy().max_wait, Some(Duration::from_secs(840)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_if_not_exists_is_idempotent() {
        let engine = Arc::new(ScriptedEngine::succeeding());
        let runner = runner(engine.clone(), None);
        let ddl = "ALTER TABLE db.t ADD IF NOT EXISTS PARTITION (year = '2021');";
        runner.run_query(ddl).await.unwrap();
        runner.run_query(ddl).await.unwrap();
        assert_eq!(engine.submissions().len(), 2);
    }
}
