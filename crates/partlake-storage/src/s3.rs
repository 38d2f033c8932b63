use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use partlake_core::{LakeError, Result};
use tracing::debug;

use crate::ObjectStore;

#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration (env, profile, IAM role).
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config))
    }
}

/// `CopySource` header value: bucket, then the key URL-encoded per segment.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let encoded = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", bucket, encoded)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn copy_object(&self, bucket: &str, source_key: &str, target_key: &str) -> Result<()> {
        debug!(bucket, source_key, target_key, "CopyObject");
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, source_key))
            .key(target_key)
            .send()
            .await
            .map_err(|e| LakeError::Copy {
                key: source_key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        debug!(bucket, key, "DeleteObject");
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| LakeError::Delete {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_source_plain_key() {
        assert_eq!(
            copy_source("logs", "prefix/2022-03-04-05.abcdef.gz"),
            "logs/prefix/2022-03-04-05.abcdef.gz"
        );
    }

    #[test]
    fn test_copy_source_encodes_each_segment() {
        assert_eq!(
            copy_source("logs", "my prefix/a+b=c.gz"),
            "logs/my%20prefix/a%2Bb%3Dc.gz"
        );
    }
}
