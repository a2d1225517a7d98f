use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of asynchronous video analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum JobKind {
    Text,
    Label,
    Face,
    FaceSearch,
}

/// Status of an analysis job as reported by the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
    Error,
}

/// Identity of one submitted job. Returned by the orchestrator and passed
/// unchanged to the watcher and the paginator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub kind: JobKind,
}

/// A video stored in S3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub bucket: String,
    pub key: String,
}

impl MediaRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Where the service publishes the completion notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTarget {
    pub role_arn: String,
    pub topic_arn: String,
}

/// Label detection options.
#[derive(Debug, Clone, Validate)]
pub struct LabelOptions {
    #[garde(range(min = 0.0, max = 100.0))]
    pub min_confidence: f32,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self { min_confidence: 90.0 }
    }
}

/// Face attribute detail requested by face detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceAttributes {
    Default,
    #[default]
    All,
}

/// Face detection options.
#[derive(Debug, Clone, Default)]
pub struct FaceOptions {
    pub attributes: FaceAttributes,
}

/// Face search options.
#[derive(Debug, Clone, Validate)]
pub struct FaceSearchOptions {
    #[garde(length(min = 1, max = 255))]
    pub collection_id: String,

    #[garde(range(min = 0.0, max = 100.0))]
    pub match_threshold: f32,
}

/// Per-kind submission options, as sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOptions {
    Text,
    Label {
        min_confidence: f32,
    },
    Face {
        attributes: FaceAttributes,
    },
    FaceSearch {
        collection_id: String,
        match_threshold: f32,
        client_request_token: String,
    },
}

impl JobOptions {
    pub fn kind(&self) -> JobKind {
        match self {
            JobOptions::Text => JobKind::Text,
            JobOptions::Label { .. } => JobKind::Label,
            JobOptions::Face { .. } => JobKind::Face,
            JobOptions::FaceSearch { .. } => JobKind::FaceSearch,
        }
    }
}

/// A complete job submission request.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub media: MediaRef,
    pub notification: NotificationTarget,
    pub options: JobOptions,
}
