use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::types::QueueAttributeName;

use crate::models::notification::QueueMessage;

/// Largest batch a single receive call may return.
pub const MAX_BATCH_SIZE: i32 = 10;

/// Queue operations needed to provision a channel and consume notifications.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Create a queue and return its URL.
    async fn create_queue(&self, name: &str) -> Result<String, QueueError>;

    async fn queue_arn(&self, queue_url: &str) -> Result<String, QueueError>;

    async fn set_policy(&self, queue_url: &str, policy: &str) -> Result<(), QueueError>;

    /// Receive up to `max_messages`, waiting at most `wait` for one to arrive.
    async fn receive(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str)
        -> Result<(), QueueError>;

    async fn delete_queue(&self, queue_url: &str) -> Result<(), QueueError>;
}

/// SQS-backed notification queue.
#[derive(Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
}

impl SqsQueue {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn create_queue(&self, name: &str) -> Result<String, QueueError> {
        self.client
            .create_queue()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| QueueError::sdk("CreateQueue", e))?;

        let response = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| QueueError::sdk("GetQueueUrl", e))?;

        response
            .queue_url()
            .map(str::to_string)
            .ok_or(QueueError::MissingField("QueueUrl"))
    }

    async fn queue_arn(&self, queue_url: &str) -> Result<String, QueueError> {
        let response = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await
            .map_err(|e| QueueError::sdk("GetQueueAttributes", e))?;

        response
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::QueueArn))
            .cloned()
            .ok_or(QueueError::MissingField("QueueArn"))
    }

    async fn set_policy(&self, queue_url: &str, policy: &str) -> Result<(), QueueError> {
        self.client
            .set_queue_attributes()
            .queue_url(queue_url)
            .attributes(QueueAttributeName::Policy, policy)
            .send()
            .await
            .map_err(|e| QueueError::sdk("SetQueueAttributes", e))?;
        Ok(())
    }

    async fn receive(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        // SQS caps long polling at 20 seconds.
        let wait_secs = wait.as_secs().min(20) as i32;

        let response = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_BATCH_SIZE))
            .wait_time_seconds(wait_secs)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| QueueError::sdk("ReceiveMessage", e))?;

        response
            .messages()
            .iter()
            .map(|message| {
                Ok(QueueMessage {
                    message_id: message.message_id().map(str::to_string),
                    receipt_handle: message
                        .receipt_handle()
                        .ok_or(QueueError::MissingField("ReceiptHandle"))?
                        .to_string(),
                    body: message
                        .body()
                        .ok_or(QueueError::MissingField("Body"))?
                        .to_string(),
                })
            })
            .collect()
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::sdk("DeleteMessage", e))?;
        Ok(())
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<(), QueueError> {
        self.client
            .delete_queue()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| QueueError::sdk("DeleteQueue", e))?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("SQS {operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    #[error("SQS response missing {0}")]
    MissingField(&'static str),
}

impl QueueError {
    pub fn sdk(operation: &'static str, err: impl std::error::Error) -> Self {
        Self::Sdk {
            operation,
            message: aws_error_message(&err),
        }
    }
}

/// Flatten an SDK error and its source chain into one line.
pub(crate) fn aws_error_message(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
