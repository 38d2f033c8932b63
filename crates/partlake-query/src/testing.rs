//! Scripted in-memory [`QueryEngine`] for tests.
//!
//! Every submitted query replays the same status script; the last status
//! repeats once the script is exhausted. DDL follows the engine's partition
//! semantics: `ADD IF NOT EXISTS PARTITION` succeeds for partitions that are
//! already registered, a plain `ADD PARTITION` fails.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use partlake_core::{LakeError, QueryHandle, QueryRequest, QueryState, QueryStatus, Result};

use crate::engine::QueryEngine;

#[derive(Default)]
struct EngineState {
    next_id: u64,
    submissions: Vec<QueryRequest>,
    cursors: HashMap<String, usize>,
    overrides: HashMap<String, QueryStatus>,
    partitions: HashSet<String>,
    status_errors: HashMap<String, String>,
    status_fetches: usize,
}

pub struct ScriptedEngine {
    script: Vec<QueryStatus>,
    reject: Option<String>,
    failing: Vec<(String, String)>,
    unreadable: Vec<(String, String)>,
    state: Mutex<EngineState>,
}

impl ScriptedEngine {
    /// Every query succeeds on its first status fetch.
    pub fn succeeding() -> Self {
        Self::with_script(vec![QueryStatus::new(QueryState::Succeeded)])
    }

    pub fn with_script(script: Vec<QueryStatus>) -> Self {
        assert!(!script.is_empty(), "status script must not be empty");
        Self {
            script,
            reject: None,
            failing: Vec::new(),
            unreadable: Vec::new(),
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Every submission is rejected with `message`.
    pub fn rejecting(message: impl Into<String>) -> Self {
        let mut engine = Self::succeeding();
        engine.reject = Some(message.into());
        engine
    }

    /// Queries whose SQL contains `pattern` end FAILED with `reason`.
    pub fn fail_queries_containing(
        mut self,
        pattern: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        self.failing.push((pattern.into(), reason.into()));
        self
    }

    /// Status fetches for queries whose SQL contains `pattern` fail with
    /// `message`, as when the engine API itself errors.
    pub fn fail_status_of(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.unreadable.push((pattern.into(), message.into()));
        self
    }

    pub fn submissions(&self) -> Vec<QueryRequest> {
        self.state.lock().submissions.clone()
    }

    pub fn submitted_sql(&self) -> Vec<String> {
        self.state
            .lock()
            .submissions
            .iter()
            .map(|r| r.sql().to_string())
            .collect()
    }

    pub fn status_fetches(&self) -> usize {
        self.state.lock().status_fetches
    }

    /// Partition clauses registered through `ADD ... PARTITION` statements.
    pub fn registered_partitions(&self) -> Vec<String> {
        let mut partitions: Vec<String> = self.state.lock().partitions.iter().cloned().collect();
        partitions.sort();
        partitions
    }
}

fn partition_clause(sql: &str) -> Option<(String, bool)> {
    let upper = sql.to_ascii_uppercase();
    if !upper.contains("ALTER TABLE") {
        return None;
    }
    let add = upper.find("ADD")?;
    let open = sql[add..].find('(')? + add;
    let close = sql[open..].find(')')? + open;
    let clause: String = sql[open + 1..close]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some((clause, upper.contains("IF NOT EXISTS")))
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn start_query(&self, request: &QueryRequest) -> Result<QueryHandle> {
        if let Some(message) = &self.reject {
            return Err(LakeError::submission(message.clone()));
        }

        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("query-{:04}", state.next_id);
        state.submissions.push(request.clone());

        if let Some((_, message)) = self
            .unreadable
            .iter()
            .find(|(pattern, _)| request.sql().contains(pattern.as_str()))
        {
            state.status_errors.insert(id.clone(), message.clone());
        }

        if let Some((_, reason)) = self
            .failing
            .iter()
            .find(|(pattern, _)| request.sql().contains(pattern.as_str()))
        {
            state
                .overrides
                .insert(id.clone(), QueryStatus::with_reason(QueryState::Failed, reason.clone()));
        } else if let Some((clause, if_not_exists)) = partition_clause(request.sql()) {
            let added = state.partitions.insert(clause);
            if !added && !if_not_exists {
                state.overrides.insert(
                    id.clone(),
                    QueryStatus::with_reason(QueryState::Failed, "Partition already exists."),
                );
            }
        }

        Ok(QueryHandle::new(id))
    }

    async fn query_status(&self, handle: &QueryHandle) -> Result<QueryStatus> {
        let mut state = self.state.lock();
        state.status_fetches += 1;

        if let Some(message) = state.status_errors.get(handle.id()) {
            return Err(LakeError::Status {
                query_id: handle.id().to_string(),
                message: message.clone(),
            });
        }
        if let Some(status) = state.overrides.get(handle.id()) {
            return Ok(status.clone());
        }

        let cursor = state.cursors.entry(handle.id().to_string()).or_insert(0);
        let index = (*cursor).min(self.script.len() - 1);
        *cursor += 1;
        Ok(self.script[index].clone())
    }
}
