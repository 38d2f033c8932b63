//! Query execution model shared by the submitter, the poller and test doubles.

use std::fmt;

use crate::error::{LakeError, Result};

/// A query ready to be handed to the engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    sql: String,
    output_location: String,
    database: Option<String>,
    workgroup: Option<String>,
}

impl QueryRequest {
    /// Build a request, rejecting blank SQL before any engine call is made.
    pub fn new(sql: impl Into<String>, output_location: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return Err(LakeError::invalid_input("query text must not be empty"));
        }
        Ok(Self {
            sql,
            output_location: output_location.into(),
            database: None,
            workgroup: None,
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

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn output_location(&self) -> &str {
        &self.output_location
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn workgroup(&self) -> Option<&str> {
        self.workgroup.as_deref()
    }
}

/// Engine-assigned identifier of one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    /// No further transition happens from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a query plus the engine's explanation, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            reason: None,
        }
    }

    pub fn with_reason(state: QueryState, reason: impl Into<String>) -> Self {
        Self {
            state,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sql_is_rejected() {
        let err = QueryRequest::new("  \n ", "s3://results/").unwrap_err();
        assert!(matches!(err, LakeError::InvalidInput { .. }));
    }

    #[test]
    fn terminal_states() {
        assert!(!QueryState::Queued.is_terminal());
        assert!(!QueryState::Running.is_terminal());
        assert!(QueryState::Succeeded.is_terminal());
        assert!(QueryState::Failed.is_terminal());
        assert!(QueryState::Cancelled.is_terminal());
    }

    #[test]
    fn request_keeps_context() {
        let request = QueryRequest::new("SELECT 1", "s3://results/")
            .unwrap()
            .with_database(Some("logs".to_string()))
            .with_workgroup(None);
        assert_eq!(request.sql(), "SELECT 1");
        assert_eq!(request.output_location(), "s3://results/");
        assert_eq!(request.database(), Some("logs"));
        assert_eq!(request.workgroup(), None);
    }
}
