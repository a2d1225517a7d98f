use async_trait::async_trait;

use super::queue::aws_error_message;

/// Pub/sub topic operations needed by the notification channel.
#[async_trait]
pub trait NotificationTopic: Send + Sync {
    /// Create a topic and return its ARN.
    async fn create_topic(&self, name: &str) -> Result<String, TopicError>;

    /// Subscribe an SQS queue (by ARN) to the topic.
    async fn subscribe_queue(&self, topic_arn: &str, queue_arn: &str) -> Result<(), TopicError>;

    async fn delete_topic(&self, topic_arn: &str) -> Result<(), TopicError>;
}

/// SNS-backed notification topic.
#[derive(Clone)]
pub struct SnsTopic {
    client: aws_sdk_sns::Client,
}

impl SnsTopic {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl NotificationTopic for SnsTopic {
    async fn create_topic(&self, name: &str) -> Result<String, TopicError> {
        let response = self
            .client
            .create_topic()
            .name(name)
            .send()
            .await
            .map_err(|e| TopicError::sdk("CreateTopic", e))?;

        response
            .topic_arn()
            .map(str::to_string)
            .ok_or(TopicError::MissingField("TopicArn"))
    }

    async fn subscribe_queue(&self, topic_arn: &str, queue_arn: &str) -> Result<(), TopicError> {
        self.client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol("sqs")
            .endpoint(queue_arn)
            .send()
            .await
            .map_err(|e| TopicError::sdk("Subscribe", e))?;
        Ok(())
    }

    async fn delete_topic(&self, topic_arn: &str) -> Result<(), TopicError> {
        self.client
            .delete_topic()
            .topic_arn(topic_arn)
            .send()
            .await
            .map_err(|e| TopicError::sdk("DeleteTopic", e))?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("SNS {operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    #[error("SNS response missing {0}")]
    MissingField(&'static str),
}

impl TopicError {
    pub fn sdk(operation: &'static str, err: impl std::error::Error) -> Self {
        Self::Sdk {
            operation,
            message: aws_error_message(&err),
        }
    }
}
