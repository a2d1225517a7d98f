use std::str::FromStr;

use async_trait::async_trait;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types as rk;

use crate::models::detection::{
    AgeRange, BoundingBox, DetectionRecord, Emotion, FaceDetail, FaceMatch, FaceRecord,
    FaceSearchResult, LabelRecord, PersonMatchRecord, TextDetection, TextDetectionRecord,
    TextType,
};
use crate::models::job::{FaceAttributes, JobOptions, JobRequest, JobStatus, MediaRef};
use crate::models::result::{
    LabelAggregation, LabelSort, PageRequest, ResultPage, RetrievalOptions, TerminalStatus,
    VideoMetadata,
};

use super::image::{DetectError, ImageDetector, ImageSource};
use super::orchestrator::JobSubmitter;
use super::paginator::ResultFetcher;
use super::queue::aws_error_message;

/// Rekognition client implementing job submission, result retrieval and
/// synchronous image detection.
#[derive(Clone)]
pub struct RekognitionClient {
    client: aws_sdk_rekognition::Client,
}

impl RekognitionClient {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_rekognition::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl JobSubmitter for RekognitionClient {
    async fn submit(&self, request: &JobRequest) -> Result<String, ProviderError> {
        let video = rk::Video::builder()
            .s3_object(s3_object(&request.media))
            .build();
        let channel = rk::NotificationChannel::builder()
            .sns_topic_arn(&request.notification.topic_arn)
            .role_arn(&request.notification.role_arn)
            .build()
            .map_err(|e| ProviderError::Build(e.to_string()))?;

        let job_id = match &request.options {
            JobOptions::Text => self
                .client
                .start_text_detection()
                .video(video)
                .notification_channel(channel)
                .send()
                .await
                .map_err(|e| ProviderError::sdk("StartTextDetection", e))?
                .job_id()
                .map(str::to_string),
            JobOptions::Label { min_confidence } => self
                .client
                .start_label_detection()
                .video(video)
                .notification_channel(channel)
                .min_confidence(*min_confidence)
                .send()
                .await
                .map_err(|e| ProviderError::sdk("StartLabelDetection", e))?
                .job_id()
                .map(str::to_string),
            JobOptions::Face { attributes } => self
                .client
                .start_face_detection()
                .video(video)
                .notification_channel(channel)
                .face_attributes(match attributes {
                    FaceAttributes::All => rk::FaceAttributes::All,
                    FaceAttributes::Default => rk::FaceAttributes::Default,
                })
                .send()
                .await
                .map_err(|e| ProviderError::sdk("StartFaceDetection", e))?
                .job_id()
                .map(str::to_string),
            JobOptions::FaceSearch {
                collection_id,
                match_threshold,
                client_request_token,
            } => self
                .client
                .start_face_search()
                .video(video)
                .notification_channel(channel)
                .collection_id(collection_id)
                .face_match_threshold(*match_threshold)
                .client_request_token(client_request_token)
                .send()
                .await
                .map_err(|e| ProviderError::sdk("StartFaceSearch", e))?
                .job_id()
                .map(str::to_string),
        };

        job_id.ok_or(ProviderError::MissingField("JobId"))
    }
}

#[async_trait]
impl ResultFetcher for RekognitionClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ResultPage, ProviderError> {
        match request.options {
            RetrievalOptions::Text => {
                let out = self
                    .client
                    .get_text_detection()
                    .job_id(&request.job_id)
                    .set_next_token(request.next_token.clone())
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("GetTextDetection", e))?;

                let items = text_records(out.text_detections())?;

                Ok(build_page(
                    out.next_token(),
                    items,
                    out.job_status(),
                    out.video_metadata(),
                ))
            }
            RetrievalOptions::Label {
                sort_by,
                aggregate_by,
            } => {
                let out = self
                    .client
                    .get_label_detection()
                    .job_id(&request.job_id)
                    .set_next_token(request.next_token.clone())
                    .sort_by(match sort_by {
                        LabelSort::Timestamp => rk::LabelDetectionSortBy::Timestamp,
                        LabelSort::Name => rk::LabelDetectionSortBy::Name,
                    })
                    .aggregate_by(match aggregate_by {
                        LabelAggregation::Timestamps => rk::LabelDetectionAggregateBy::Timestamps,
                        LabelAggregation::Segments => rk::LabelDetectionAggregateBy::Segments,
                    })
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("GetLabelDetection", e))?;

                let items = label_records(out.labels())?;

                Ok(build_page(
                    out.next_token(),
                    items,
                    out.job_status(),
                    out.video_metadata(),
                ))
            }
            RetrievalOptions::Face { max_results } => {
                let out = self
                    .client
                    .get_face_detection()
                    .job_id(&request.job_id)
                    .set_next_token(request.next_token.clone())
                    .max_results(max_results)
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("GetFaceDetection", e))?;

                let items = face_records(out.faces())?;

                Ok(build_page(
                    out.next_token(),
                    items,
                    out.job_status(),
                    out.video_metadata(),
                ))
            }
            RetrievalOptions::FaceSearch => {
                let out = self
                    .client
                    .get_face_search()
                    .job_id(&request.job_id)
                    .set_next_token(request.next_token.clone())
                    .send()
                    .await
                    .map_err(|e| ProviderError::sdk("GetFaceSearch", e))?;

                let items = person_records(out.persons());

                Ok(build_page(
                    out.next_token(),
                    items,
                    out.job_status(),
                    out.video_metadata(),
                ))
            }
        }
    }
}

#[async_trait]
impl ImageDetector for RekognitionClient {
    async fn detect_text(&self, image: &ImageSource) -> Result<Vec<TextDetection>, DetectError> {
        let out = self
            .client
            .detect_text()
            .image(rekognition_image(image))
            .send()
            .await
            .map_err(|e| DetectError::Provider(ProviderError::sdk("DetectText", e)))?;

        let detections = out
            .text_detections()
            .iter()
            .map(convert_text)
            .collect::<Result<_, _>>()?;
        Ok(detections)
    }

    async fn detect_faces(&self, image: &ImageSource) -> Result<Vec<FaceDetail>, DetectError> {
        let out = self
            .client
            .detect_faces()
            .image(rekognition_image(image))
            .attributes(rk::Attribute::All)
            .send()
            .await
            .map_err(|e| DetectError::Provider(ProviderError::sdk("DetectFaces", e)))?;

        Ok(out.face_details().iter().map(convert_face).collect())
    }

    async fn search_faces(
        &self,
        image: &ImageSource,
        collection_id: &str,
        max_faces: i32,
        match_threshold: f32,
    ) -> Result<FaceSearchResult, DetectError> {
        let out = self
            .client
            .search_faces_by_image()
            .collection_id(collection_id)
            .image(rekognition_image(image))
            .max_faces(max_faces)
            .face_match_threshold(match_threshold)
            .send()
            .await
            .map_err(|e| {
                // Rekognition rejects images without a detectable face as an
                // invalid parameter.
                let no_face = e
                    .as_service_error()
                    .map(|service| service.is_invalid_parameter_exception())
                    .unwrap_or(false);
                if no_face {
                    DetectError::NoFace(aws_error_message(&e))
                } else {
                    DetectError::Provider(ProviderError::sdk("SearchFacesByImage", e))
                }
            })?;

        Ok(FaceSearchResult {
            face_matches: out.face_matches().iter().map(convert_face_match).collect(),
            searched_face_bounding_box: out.searched_face_bounding_box().map(convert_box),
            searched_face_confidence: opt(out.searched_face_confidence()),
        })
    }
}

fn s3_object(media: &MediaRef) -> rk::S3Object {
    rk::S3Object::builder()
        .bucket(&media.bucket)
        .name(&media.key)
        .build()
}

fn rekognition_image(image: &ImageSource) -> rk::Image {
    match image {
        ImageSource::Bytes(bytes) => rk::Image::builder().bytes(Blob::new(bytes.clone())).build(),
        ImageSource::Stored(media) => rk::Image::builder().s3_object(s3_object(media)).build(),
    }
}

/// Only the page without a continuation token carries the terminal status.
fn build_page(
    next_token: Option<&str>,
    items: Vec<DetectionRecord>,
    job_status: Option<&rk::VideoJobStatus>,
    metadata: Option<&rk::VideoMetadata>,
) -> ResultPage {
    let next_token = next_token
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let terminal = match next_token {
        Some(_) => None,
        None => job_status
            .and_then(|status| JobStatus::from_str(status.as_str()).ok())
            .map(|job_status| TerminalStatus {
                job_status,
                video_metadata: metadata.map(convert_metadata),
            }),
    };

    ResultPage {
        next_token,
        items,
        terminal,
    }
}

fn convert_metadata(metadata: &rk::VideoMetadata) -> VideoMetadata {
    VideoMetadata {
        codec: metadata.codec().map(str::to_string),
        duration_millis: opt(metadata.duration_millis()),
        format: metadata.format().map(str::to_string),
        frame_rate: opt(metadata.frame_rate()),
        frame_width: opt(metadata.frame_width()),
        frame_height: opt(metadata.frame_height()),
    }
}

// Every provider item maps to exactly one record; an item missing a field
// the record needs fails the whole page instead of being skipped.

fn text_records(results: &[rk::TextDetectionResult]) -> Result<Vec<DetectionRecord>, ProviderError> {
    results
        .iter()
        .map(|result| {
            let text = result
                .text_detection()
                .ok_or(ProviderError::MissingField("TextDetection"))?;
            Ok(DetectionRecord::Text(TextDetectionRecord {
                timestamp_ms: millis(result.timestamp()),
                text: convert_text(text)?,
            }))
        })
        .collect()
}

fn label_records(detections: &[rk::LabelDetection]) -> Result<Vec<DetectionRecord>, ProviderError> {
    detections
        .iter()
        .map(|detection| {
            let label = detection.label().ok_or(ProviderError::MissingField("Label"))?;
            Ok(DetectionRecord::Label(LabelRecord {
                timestamp_ms: millis(detection.timestamp()),
                name: label
                    .name()
                    .ok_or(ProviderError::MissingField("Label.Name"))?
                    .to_string(),
                confidence: opt(label.confidence()),
                parents: label
                    .parents()
                    .iter()
                    .filter_map(|parent| parent.name().map(str::to_string))
                    .collect(),
                instances: label
                    .instances()
                    .iter()
                    .filter_map(|instance| instance.bounding_box())
                    .map(convert_box)
                    .collect(),
            }))
        })
        .collect()
}

fn face_records(detections: &[rk::FaceDetection]) -> Result<Vec<DetectionRecord>, ProviderError> {
    detections
        .iter()
        .map(|detection| {
            let face = detection.face().ok_or(ProviderError::MissingField("Face"))?;
            Ok(DetectionRecord::Face(FaceRecord {
                timestamp_ms: millis(detection.timestamp()),
                face: convert_face(face),
            }))
        })
        .collect()
}

fn person_records(persons: &[rk::PersonMatch]) -> Vec<DetectionRecord> {
    persons
        .iter()
        .map(|person_match| {
            let person = person_match.person();
            DetectionRecord::Person(PersonMatchRecord {
                timestamp_ms: millis(person_match.timestamp()),
                person_index: person.and_then(|p| opt(p.index())),
                bounding_box: person.and_then(|p| p.bounding_box()).map(convert_box),
                face_matches: person_match
                    .face_matches()
                    .iter()
                    .map(convert_face_match)
                    .collect(),
            })
        })
        .collect()
}

fn convert_text(text: &rk::TextDetection) -> Result<TextDetection, ProviderError> {
    let detected_text = text
        .detected_text()
        .ok_or(ProviderError::MissingField("DetectedText"))?;
    let text_type = text.r#type().ok_or(ProviderError::MissingField("Type"))?;

    Ok(TextDetection {
        detected_text: detected_text.to_string(),
        text_type: TextType::from_str(text_type.as_str()).map_err(|_| {
            ProviderError::UnexpectedValue {
                field: "Type",
                value: text_type.as_str().to_string(),
            }
        })?,
        id: opt(text.id()),
        parent_id: opt(text.parent_id()),
        confidence: opt(text.confidence()),
        bounding_box: text
            .geometry()
            .and_then(|geometry| geometry.bounding_box())
            .map(convert_box),
    })
}

fn convert_face(face: &rk::FaceDetail) -> FaceDetail {
    FaceDetail {
        bounding_box: face.bounding_box().map(convert_box),
        confidence: opt(face.confidence()),
        age_range: face.age_range().map(|range| AgeRange {
            low: opt(range.low()),
            high: opt(range.high()),
        }),
        gender: face
            .gender()
            .and_then(|gender| gender.value())
            .map(|value| value.as_str().to_string()),
        smile: face.smile().and_then(|smile| opt(smile.value())),
        emotions: face
            .emotions()
            .iter()
            .filter_map(|emotion| {
                Some(Emotion {
                    name: emotion.r#type()?.as_str().to_string(),
                    confidence: opt(emotion.confidence()),
                })
            })
            .collect(),
    }
}

fn convert_face_match(face_match: &rk::FaceMatch) -> FaceMatch {
    let face = face_match.face();
    FaceMatch {
        similarity: opt(face_match.similarity()),
        face_id: face.and_then(|f| f.face_id()).map(str::to_string),
        external_image_id: face
            .and_then(|f| f.external_image_id())
            .map(str::to_string),
    }
}

fn convert_box(bounding_box: &rk::BoundingBox) -> BoundingBox {
    BoundingBox {
        left: opt(bounding_box.left()).unwrap_or_default(),
        top: opt(bounding_box.top()).unwrap_or_default(),
        width: opt(bounding_box.width()).unwrap_or_default(),
        height: opt(bounding_box.height()).unwrap_or_default(),
    }
}

// Rekognition models some scalars as defaulted primitives and others as
// optional; these accept either shape.
fn opt<T>(value: impl Into<Option<T>>) -> Option<T> {
    value.into()
}

fn millis(value: impl Into<Option<i64>>) -> i64 {
    value.into().unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Rekognition {operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    #[error("Rekognition response missing {0}")]
    MissingField(&'static str),

    #[error("Rekognition response has unexpected {field}: {value}")]
    UnexpectedValue { field: &'static str, value: String },

    #[error("Invalid Rekognition request: {0}")]
    Build(String),
}

impl ProviderError {
    pub fn sdk(operation: &'static str, err: impl std::error::Error) -> Self {
        Self::Sdk {
            operation,
            message: aws_error_message(&err),
        }
    }
}
