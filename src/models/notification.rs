use serde::Deserialize;

use super::job::JobStatus;

/// A raw message received from the notification queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    pub receipt_handle: String,
    pub body: String,
}

/// Completion notification decoded from a queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub job_id: String,
    pub status: JobStatus,
    pub api: Option<String>,
    pub receipt_handle: String,
    pub raw_envelope: String,
}

/// Outer SNS envelope; `Message` holds the service payload as a JSON string.
#[derive(Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobNotification {
    job_id: String,
    status: JobStatus,
    #[serde(rename = "API", default)]
    api: Option<String>,
}

impl NotificationMessage {
    /// Decode the nested envelope of a queue message.
    pub fn parse(message: &QueueMessage) -> Result<Self, EnvelopeError> {
        let envelope: SnsEnvelope =
            serde_json::from_str(&message.body).map_err(EnvelopeError::Envelope)?;
        let notification: JobNotification =
            serde_json::from_str(&envelope.message).map_err(EnvelopeError::Notification)?;

        Ok(Self {
            job_id: notification.job_id,
            status: notification.status,
            api: notification.api,
            receipt_handle: message.receipt_handle.clone(),
            raw_envelope: message.body.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Queue message body is not an SNS envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("SNS message is not a job notification: {0}")]
    Notification(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_message(body: &str) -> QueueMessage {
        QueueMessage {
            message_id: Some("m-1".to_string()),
            receipt_handle: "rh-1".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_nested_envelope() {
        let inner = r#"{"JobId":"abc123","Status":"SUCCEEDED","API":"StartLabelDetection"}"#;
        let body = serde_json::json!({ "Type": "Notification", "Message": inner }).to_string();

        let parsed = NotificationMessage::parse(&queue_message(&body)).unwrap();
        assert_eq!(parsed.job_id, "abc123");
        assert_eq!(parsed.status, JobStatus::Succeeded);
        assert_eq!(parsed.api.as_deref(), Some("StartLabelDetection"));
        assert_eq!(parsed.receipt_handle, "rh-1");
        assert_eq!(parsed.raw_envelope, body);
    }

    #[test]
    fn test_missing_message_field_is_envelope_error() {
        let err = NotificationMessage::parse(&queue_message(r#"{"Type":"Notification"}"#))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Envelope(_)));
    }

    #[test]
    fn test_missing_job_id_is_notification_error() {
        let body = serde_json::json!({ "Message": r#"{"Status":"FAILED"}"# }).to_string();
        let err = NotificationMessage::parse(&queue_message(&body)).unwrap_err();
        assert!(matches!(err, EnvelopeError::Notification(_)));
    }
}
