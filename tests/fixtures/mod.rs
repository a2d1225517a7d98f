//! Builders for queue notifications and result pages

#![allow(dead_code)]

use media_analysis_jobs::models::detection::{
    DetectionRecord, TextDetection, TextDetectionRecord, TextType,
};
use media_analysis_jobs::models::job::JobStatus;
use media_analysis_jobs::models::notification::QueueMessage;
use media_analysis_jobs::models::result::{ResultPage, TerminalStatus, VideoMetadata};

/// A queue message carrying a Rekognition completion notification wrapped in
/// an SNS envelope.
pub fn notification(receipt_handle: &str, job_id: &str, status: &str) -> QueueMessage {
    let inner = serde_json::json!({
        "JobId": job_id,
        "Status": status,
        "API": "StartTextDetection",
        "Timestamp": 1_700_000_000_000_i64,
        "Video": { "S3ObjectName": "ads/spot-001.mp4", "S3Bucket": "media" }
    });
    let body = serde_json::json!({
        "Type": "Notification",
        "MessageId": format!("sns-{receipt_handle}"),
        "TopicArn": "arn:aws:sns:us-east-1:123456789012:media-analysis",
        "Message": inner.to_string(),
    });

    QueueMessage {
        message_id: Some(format!("msg-{receipt_handle}")),
        receipt_handle: receipt_handle.to_string(),
        body: body.to_string(),
    }
}

/// A queue message whose body is not an SNS envelope.
pub fn malformed(receipt_handle: &str) -> QueueMessage {
    QueueMessage {
        message_id: Some(format!("msg-{receipt_handle}")),
        receipt_handle: receipt_handle.to_string(),
        body: r#"{"Records":[]}"#.to_string(),
    }
}

/// A LINE text detection at a timestamp.
pub fn line(timestamp_ms: i64, text: &str) -> DetectionRecord {
    DetectionRecord::Text(TextDetectionRecord {
        timestamp_ms,
        text: TextDetection {
            detected_text: text.to_string(),
            text_type: TextType::Line,
            id: None,
            parent_id: None,
            confidence: Some(97.5),
            bounding_box: None,
        },
    })
}

pub fn metadata(duration_millis: i64) -> VideoMetadata {
    VideoMetadata {
        codec: Some("h264".to_string()),
        duration_millis: Some(duration_millis),
        format: Some("QuickTime / MOV".to_string()),
        frame_rate: Some(29.97),
        frame_width: Some(1920),
        frame_height: Some(1080),
    }
}

/// An intermediate page pointing at `token`.
pub fn page(items: Vec<DetectionRecord>, token: &str) -> ResultPage {
    ResultPage {
        next_token: Some(token.to_string()),
        items,
        terminal: None,
    }
}

/// The last page of a result.
pub fn terminal_page(items: Vec<DetectionRecord>, status: JobStatus, duration_millis: i64) -> ResultPage {
    ResultPage {
        next_token: None,
        items,
        terminal: Some(TerminalStatus {
            job_status: status,
            video_metadata: Some(metadata(duration_millis)),
        }),
    }
}
