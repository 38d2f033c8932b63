//! Seam between the query runner and the managed query engine.

use async_trait::async_trait;
use partlake_core::{QueryHandle, QueryRequest, QueryStatus, Result};

/// A managed SQL engine that executes queries asynchronously.
///
/// Implementations report engine failures unmodified: rejected submissions
/// as `LakeError::Submission`, failed status lookups as `LakeError::Status`.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit one query. No retry is attempted.
    async fn start_query(&self, request: &QueryRequest) -> Result<QueryHandle>;

    /// Observe the current state of a submitted query.
    async fn query_status(&self, handle: &QueryHandle) -> Result<QueryStatus>;
}
