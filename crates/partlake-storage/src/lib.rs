// partlake-storage - Object relocation within a bucket
//
// The access-log mover only needs two primitives: server-side copy and
// delete. Both are behind `ObjectStore` so the handlers stay testable.

use async_trait::async_trait;
use partlake_core::Result;

mod s3;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use s3::{copy_source, S3ObjectStore};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Server-side copy of `source_key` to `target_key` within `bucket`.
    /// Failures are reported as `LakeError::Copy` keyed by the source.
    async fn copy_object(&self, bucket: &str, source_key: &str, target_key: &str) -> Result<()>;

    /// Failures are reported as `LakeError::Delete`.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}
