use std::sync::Arc;

use async_trait::async_trait;

use crate::models::detection::{FaceDetail, FaceSearchResult, TextDetection};
use crate::models::job::MediaRef;

use super::rekognition::ProviderError;

/// Default cap on collection faces returned by a face search.
pub const DEFAULT_MAX_FACES: i32 = 123;

/// Image passed inline or by S3 reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Stored(MediaRef),
}

/// Synchronous single-image detection calls.
#[async_trait]
pub trait ImageDetector: Send + Sync {
    async fn detect_text(&self, image: &ImageSource) -> Result<Vec<TextDetection>, DetectError>;

    /// Detect faces with all attributes.
    async fn detect_faces(&self, image: &ImageSource) -> Result<Vec<FaceDetail>, DetectError>;

    async fn search_faces(
        &self,
        image: &ImageSource,
        collection_id: &str,
        max_faces: i32,
        match_threshold: f32,
    ) -> Result<FaceSearchResult, DetectError>;
}

/// Image detection with soft failures: provider errors are logged and turned
/// into `None` so batch callers can move on to the next image.
#[derive(Clone)]
pub struct ImageAnalyzer {
    detector: Arc<dyn ImageDetector>,
}

impl ImageAnalyzer {
    pub fn new(detector: Arc<dyn ImageDetector>) -> Self {
        Self { detector }
    }

    pub async fn detect_text(&self, image: &ImageSource, name: &str) -> Option<Vec<TextDetection>> {
        match self.detector.detect_text(image).await {
            Ok(detections) => Some(detections),
            Err(e) => {
                record_failure("detect_text");
                tracing::warn!(image = %name, error = %e, "Couldn't detect text");
                None
            }
        }
    }

    /// `None` when the call failed or the image contains no faces.
    pub async fn detect_faces(&self, image: &ImageSource, name: &str) -> Option<Vec<FaceDetail>> {
        match self.detector.detect_faces(image).await {
            Ok(faces) if faces.is_empty() => {
                tracing::debug!(image = %name, "No faces detected");
                None
            }
            Ok(faces) => Some(faces),
            Err(e) => {
                record_failure("detect_faces");
                tracing::warn!(image = %name, error = %e, "Couldn't detect faces");
                None
            }
        }
    }

    pub async fn search_faces(
        &self,
        image: &ImageSource,
        name: &str,
        collection_id: &str,
        max_faces: i32,
        match_threshold: f32,
    ) -> Option<FaceSearchResult> {
        match self
            .detector
            .search_faces(image, collection_id, max_faces, match_threshold)
            .await
        {
            Ok(result) => Some(result),
            Err(DetectError::NoFace(_)) => {
                tracing::warn!(image = %name, "No faces in image");
                None
            }
            Err(e) => {
                record_failure("search_faces");
                tracing::warn!(image = %name, error = %e, "Couldn't find matching faces");
                None
            }
        }
    }
}

fn record_failure(operation: &'static str) {
    metrics::counter!("image_detection_failures_total", "operation" => operation).increment(1);
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("No face found in image: {0}")]
    NoFace(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
