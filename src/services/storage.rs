use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::Serialize;

use crate::models::job::JobHandle;

/// S3 bucket where analysis results are persisted.
pub struct ResultStore {
    bucket: Box<Bucket>,
    prefix: String,
}

impl ResultStore {
    /// Credentials come from the standard AWS environment/profile chain.
    /// `endpoint` overrides the regional endpoint (S3-compatible stores).
    pub fn new(
        bucket_name: &str,
        region: &str,
        endpoint: Option<&str>,
        prefix: &str,
    ) -> Result<Self, StorageError> {
        let region = match endpoint {
            Some(endpoint) => Region::Custom {
                region: region.to_string(),
                endpoint: endpoint.to_string(),
            },
            None => region
                .parse::<Region>()
                .map_err(|e| StorageError::Config(e.to_string()))?,
        };

        let credentials =
            Credentials::default().map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Object key for a job's results: `<prefix>/<job_id>/<kind>.json`.
    pub fn result_key(&self, handle: &JobHandle) -> String {
        result_key(&self.prefix, &handle.job_id, &handle.kind.to_string().to_lowercase())
    }

    /// Object key for one image's detections: `<prefix>/images/<image>.json`.
    pub fn image_result_key(&self, image: &str) -> String {
        result_key(&self.prefix, "images", image)
    }

    /// Upload raw bytes.
    pub async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(StorageError::S3)?;
        tracing::debug!(key = %key, bytes = data.len(), "Uploaded object");
        Ok(())
    }

    /// Serialize `value` as JSON and upload it under `key`.
    pub async fn upload_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let body = serde_json::to_vec(value).map_err(StorageError::Serialize)?;
        self.upload(key, &body, "application/json").await
    }
}

pub fn result_key(prefix: &str, name: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        format!("{name}/{suffix}.json")
    } else {
        format!("{prefix}/{name}/{suffix}.json")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_key_layout() {
        assert_eq!(result_key("results", "job-9", "label"), "results/job-9/label.json");
        assert_eq!(result_key("", "job-9", "text"), "job-9/text.json");
    }
}
