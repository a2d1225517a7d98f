use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use garde::Validate;

use crate::models::channel::ChannelDescriptor;
use crate::models::job::{
    FaceOptions, FaceSearchOptions, JobHandle, JobOptions, JobRequest, LabelOptions, MediaRef,
    NotificationTarget,
};

use super::rekognition::ProviderError;

/// Submits asynchronous analysis jobs to the service.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submit a job and return the service-issued job id.
    async fn submit(&self, request: &JobRequest) -> Result<String, ProviderError>;
}

/// Starts video analysis jobs that report completion to a notification
/// channel. Holds no per-job state: every job is identified by the returned
/// [`JobHandle`].
#[derive(Clone)]
pub struct JobOrchestrator {
    submitter: Arc<dyn JobSubmitter>,
    role_arn: String,
}

impl JobOrchestrator {
    /// `role_arn` is the role the service assumes to publish to the topic.
    pub fn new(submitter: Arc<dyn JobSubmitter>, role_arn: impl Into<String>) -> Self {
        Self {
            submitter,
            role_arn: role_arn.into(),
        }
    }

    pub async fn start_text_detection(
        &self,
        media: &MediaRef,
        channel: &ChannelDescriptor,
    ) -> Result<JobHandle, SubmitError> {
        self.start(media, channel, JobOptions::Text).await
    }

    pub async fn start_label_detection(
        &self,
        media: &MediaRef,
        channel: &ChannelDescriptor,
        options: &LabelOptions,
    ) -> Result<JobHandle, SubmitError> {
        options.validate().map_err(SubmitError::InvalidOptions)?;
        self.start(
            media,
            channel,
            JobOptions::Label {
                min_confidence: options.min_confidence,
            },
        )
        .await
    }

    pub async fn start_face_detection(
        &self,
        media: &MediaRef,
        channel: &ChannelDescriptor,
        options: &FaceOptions,
    ) -> Result<JobHandle, SubmitError> {
        self.start(
            media,
            channel,
            JobOptions::Face {
                attributes: options.attributes,
            },
        )
        .await
    }

    /// Start a face search against a collection. The request carries an
    /// idempotency token so a retried submission does not start a second job.
    pub async fn start_face_search(
        &self,
        media: &MediaRef,
        channel: &ChannelDescriptor,
        collection_id: &str,
        match_threshold: f32,
    ) -> Result<JobHandle, SubmitError> {
        let options = FaceSearchOptions {
            collection_id: collection_id.to_string(),
            match_threshold,
        };
        options.validate().map_err(SubmitError::InvalidOptions)?;

        self.start(
            media,
            channel,
            JobOptions::FaceSearch {
                collection_id: options.collection_id,
                match_threshold: options.match_threshold,
                client_request_token: client_request_token(),
            },
        )
        .await
    }

    async fn start(
        &self,
        media: &MediaRef,
        channel: &ChannelDescriptor,
        options: JobOptions,
    ) -> Result<JobHandle, SubmitError> {
        let kind = options.kind();
        let request = JobRequest {
            media: media.clone(),
            notification: NotificationTarget {
                role_arn: self.role_arn.clone(),
                topic_arn: channel.topic_arn.clone(),
            },
            options,
        };

        let job_id = self.submitter.submit(&request).await?;
        if job_id.is_empty() {
            return Err(SubmitError::EmptyJobId);
        }

        metrics::counter!("analysis_jobs_submitted_total", "kind" => kind.to_string())
            .increment(1);
        tracing::info!(
            job_id = %job_id,
            kind = %kind,
            bucket = %media.bucket,
            key = %media.key,
            "Analysis job started"
        );

        Ok(JobHandle { job_id, kind })
    }
}

/// Idempotency token derived from the wall clock in milliseconds.
pub fn client_request_token() -> String {
    format!("tok-{}", Utc::now().timestamp_millis())
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Job submission failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid job options: {0}")]
    InvalidOptions(garde::Report),

    #[error("Service returned an empty job id")]
    EmptyJobId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_token_is_millisecond_timestamp() {
        let before = Utc::now().timestamp_millis();
        let token = client_request_token();
        let millis: i64 = token.strip_prefix("tok-").unwrap().parse().unwrap();
        assert!(millis >= before);
        assert!(token.len() <= 64);
    }
}
