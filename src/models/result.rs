use serde::{Deserialize, Serialize};

use super::detection::DetectionRecord;
use super::job::{JobKind, JobStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub codec: Option<String>,
    pub duration_millis: Option<i64>,
    pub format: Option<String>,
    pub frame_rate: Option<f32>,
    pub frame_width: Option<i64>,
    pub frame_height: Option<i64>,
}

/// Status reported on the last page of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalStatus {
    pub job_status: JobStatus,
    pub video_metadata: Option<VideoMetadata>,
}

/// One page of a paginated result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub next_token: Option<String>,
    pub items: Vec<DetectionRecord>,
    /// Only meaningful on the page without a continuation token.
    pub terminal: Option<TerminalStatus>,
}

impl ResultPage {
    /// Continuation token, with an empty token treated as absent.
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSort {
    Timestamp,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAggregation {
    Timestamps,
    Segments,
}

/// Fixed retrieval options sent with every page request of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalOptions {
    Text,
    Label {
        sort_by: LabelSort,
        aggregate_by: LabelAggregation,
    },
    Face {
        max_results: i32,
    },
    FaceSearch,
}

/// Page size used when retrieving face detection results.
pub const FACE_PAGE_SIZE: i32 = 123;

impl RetrievalOptions {
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::Text => RetrievalOptions::Text,
            JobKind::Label => RetrievalOptions::Label {
                sort_by: LabelSort::Timestamp,
                aggregate_by: LabelAggregation::Timestamps,
            },
            JobKind::Face => RetrievalOptions::Face {
                max_results: FACE_PAGE_SIZE,
            },
            JobKind::FaceSearch => RetrievalOptions::FaceSearch,
        }
    }
}

/// Request for one page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub job_id: String,
    pub kind: JobKind,
    pub next_token: Option<String>,
    pub options: RetrievalOptions,
}

/// All pages of a job merged in fetch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub job_id: String,
    pub kind: JobKind,
    pub job_status: JobStatus,
    pub video_metadata: Option<VideoMetadata>,
    pub items: Vec<DetectionRecord>,
}
