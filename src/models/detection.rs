use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Normalized bounding box (fractions of frame width/height).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TextType {
    Line,
    Word,
}

/// A piece of text found in an image or video frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    pub detected_text: String,
    pub text_type: TextType,
    pub id: Option<i32>,
    pub parent_id: Option<i32>,
    pub confidence: Option<f32>,
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetectionRecord {
    pub timestamp_ms: i64,
    pub text: TextDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub timestamp_ms: i64,
    pub name: String,
    pub confidence: Option<f32>,
    pub parents: Vec<String>,
    pub instances: Vec<BoundingBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    pub low: Option<i32>,
    pub high: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub name: String,
    pub confidence: Option<f32>,
}

/// Face attributes returned by face detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetail {
    pub bounding_box: Option<BoundingBox>,
    pub confidence: Option<f32>,
    pub age_range: Option<AgeRange>,
    pub gender: Option<String>,
    pub smile: Option<bool>,
    pub emotions: Vec<Emotion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub timestamp_ms: i64,
    pub face: FaceDetail,
}

/// A collection face matched against a searched face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub similarity: Option<f32>,
    pub face_id: Option<String>,
    pub external_image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonMatchRecord {
    pub timestamp_ms: i64,
    pub person_index: Option<i64>,
    pub bounding_box: Option<BoundingBox>,
    pub face_matches: Vec<FaceMatch>,
}

/// One item of a paginated result, tagged by job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionRecord {
    Text(TextDetectionRecord),
    Label(LabelRecord),
    Face(FaceRecord),
    Person(PersonMatchRecord),
}

impl DetectionRecord {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            DetectionRecord::Text(r) => r.timestamp_ms,
            DetectionRecord::Label(r) => r.timestamp_ms,
            DetectionRecord::Face(r) => r.timestamp_ms,
            DetectionRecord::Person(r) => r.timestamp_ms,
        }
    }
}

/// Result of searching a collection with the largest face in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSearchResult {
    pub face_matches: Vec<FaceMatch>,
    pub searched_face_bounding_box: Option<BoundingBox>,
    pub searched_face_confidence: Option<f32>,
}
