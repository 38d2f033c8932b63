//! Error types shared by every partlake function.

use std::time::Duration;

use thiserror::Error;

use crate::types::QueryState;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E101: Query engine rejected the submission
    E101Submission,
    /// E102: Query status could not be fetched
    E102Status,
    /// E103: Query reached FAILED or CANCELLED
    E103Execution,
    /// E104: Query did not finish within the maximum wait
    E104Timeout,
    /// E105: Caller stopped waiting for the query
    E105Aborted,
    /// E201: Malformed input (dates, identifiers, SQL text)
    E201InvalidInput,
    /// E301: Object copy failed
    E301Copy,
    /// E302: Object delete failed after a successful copy
    E302Delete,
    /// E303: One or more records of a batch failed
    E303Batch,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E101Submission => "E101",
            Self::E102Status => "E102",
            Self::E103Execution => "E103",
            Self::E104Timeout => "E104",
            Self::E105Aborted => "E105",
            Self::E201InvalidInput => "E201",
            Self::E301Copy => "E301",
            Self::E302Delete => "E302",
            Self::E303Batch => "E303",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by partlake functions.
///
/// Every variant propagates to the invocation result unchanged so the
/// scheduler that triggered the function can alert or retry.
#[derive(Debug, Error)]
pub enum LakeError {
    /// Engine rejected the request (malformed SQL, access denied, throttling)
    #[error("[E101] Query submission rejected: {message}")]
    Submission { message: String },

    /// Engine could not report the state of a submitted query
    #[error("[E102] Failed to fetch status of query {query_id}: {message}")]
    Status { query_id: String, message: String },

    /// Query reached a failed terminal state
    #[error("[E103] Query {query_id} {state}: {reason}")]
    Execution {
        query_id: String,
        state: QueryState,
        reason: String,
    },

    /// Query still running when the maximum wait expired
    #[error("[E104] Query {query_id} did not finish within {waited:?}")]
    Timeout { query_id: String, waited: Duration },

    /// Waiting was cancelled; the query itself keeps running
    #[error("[E105] Stopped waiting for query {query_id}")]
    Aborted { query_id: String },

    #[error("[E201] Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("[E301] Error while copying {key}: {reason}")]
    Copy { key: String, reason: String },

    /// The copy succeeded, so the object now exists at both keys
    #[error("[E302] Copied {key} but failed to delete it: {reason}")]
    Delete { key: String, reason: String },

    #[error("[E303] {failed} of {total} records failed: {summary}")]
    Batch {
        failed: usize,
        total: usize,
        summary: String,
    },
}

impl LakeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Submission { .. } => ErrorCode::E101Submission,
            Self::Status { .. } => ErrorCode::E102Status,
            Self::Execution { .. } => ErrorCode::E103Execution,
            Self::Timeout { .. } => ErrorCode::E104Timeout,
            Self::Aborted { .. } => ErrorCode::E105Aborted,
            Self::InvalidInput { .. } => ErrorCode::E201InvalidInput,
            Self::Copy { .. } => ErrorCode::E301Copy,
            Self::Delete { .. } => ErrorCode::E302Delete,
            Self::Batch { .. } => ErrorCode::E303Batch,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
        }
    }
}

/// Result type alias for LakeError
pub type Result<T> = std::result::Result<T, LakeError>;
