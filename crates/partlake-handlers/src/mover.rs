//! Relocation of CDN access-log objects into a partitioned layout
//!
//! Every notification record is handled by its own future; the futures are
//! joined, so one failing record never stops its siblings.

use aws_lambda_events::event::s3::S3Event;
use futures::future::join_all;
use partlake_core::{decode_event_key, AccessLogKey, LakeError, PartitionLayout, Result};
use partlake_storage::ObjectStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One object-created notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Object references carried by an S3 notification, keys URL-decoded.
///
/// Records without a bucket name or key are dropped with a warning.
pub fn records_from_s3_event(event: &S3Event) -> Vec<ObjectRef> {
    event
        .records
        .iter()
        .filter_map(|record| {
            let bucket = record.s3.bucket.name.as_deref();
            let key = record.s3.object.key.as_deref();
            match (bucket, key) {
                (Some(bucket), Some(key)) => Some(ObjectRef::new(bucket, decode_event_key(key))),
                _ => {
                    warn!(event_name = ?record.event_name, "Notification record without bucket or key");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug)]
pub enum MoveOutcome {
    Moved { source: String, target: String },
    /// Key did not look like an access log, or already sits at its target
    Skipped { key: String },
    Failed(LakeError),
}

impl MoveOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-record outcomes in notification order.
#[derive(Debug, Default)]
pub struct MoveReport {
    pub outcomes: Vec<MoveOutcome>,
}

impl MoveReport {
    pub fn moved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MoveOutcome::Moved { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MoveOutcome::Skipped { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &LakeError> {
        self.outcomes.iter().filter_map(|o| match o {
            MoveOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    /// `LakeError::Batch` when any record failed.
    pub fn into_result(self) -> Result<MoveReport> {
        let failed = self.failures().count();
        if failed == 0 {
            return Ok(self);
        }
        let summary = self
            .failures()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(LakeError::Batch {
            failed,
            total: self.outcomes.len(),
            summary,
        })
    }
}

/// Copy each recognised access log under `prefix` and delete the original.
///
/// All records run to completion before this returns. Inspect the report or
/// call [`MoveReport::into_result`] to fail the invocation on any error.
pub async fn move_access_logs(
    store: &dyn ObjectStore,
    prefix: &str,
    layout: PartitionLayout,
    records: &[ObjectRef],
) -> MoveReport {
    let moves = records
        .iter()
        .map(|record| move_one(store, prefix, layout, record));
    let report = MoveReport {
        outcomes: join_all(moves).await,
    };

    info!(
        records = records.len(),
        moved = report.moved(),
        skipped = report.skipped(),
        failed = report.failures().count(),
        "Access log relocation finished"
    );
    report
}

async fn move_one(
    store: &dyn ObjectStore,
    prefix: &str,
    layout: PartitionLayout,
    record: &ObjectRef,
) -> MoveOutcome {
    let Some(log_key) = AccessLogKey::parse(&record.key) else {
        info!(
            key = %record.key,
            "Object key does not look like an access log file, so it will not be moved"
        );
        return MoveOutcome::Skipped {
            key: record.key.clone(),
        };
    };

    let target = log_key.target_key(prefix, layout);
    if target == record.key {
        info!(key = %record.key, "Access log is already in its partition, so it will not be moved");
        return MoveOutcome::Skipped {
            key: record.key.clone(),
        };
    }
    info!(source = %record.key, target = %target, "Copying access log");

    if let Err(err) = store.copy_object(&record.bucket, &record.key, &target).await {
        warn!(key = %record.key, error = %err, "Copy failed");
        return MoveOutcome::Failed(err);
    }
    if let Err(err) = store.delete_object(&record.bucket, &record.key).await {
        warn!(key = %record.key, error = %err, "Delete after copy failed");
        return MoveOutcome::Failed(err);
    }

    MoveOutcome::Moved {
        source: record.key.clone(),
        target,
    }
}
