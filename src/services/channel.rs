use std::sync::Arc;

use crate::models::channel::{ChannelDescriptor, PartialChannel, ProvisionStep};

use super::queue::{MessageQueue, QueueError};
use super::topic::{NotificationTopic, TopicError};

/// Provisions and tears down the topic + queue pair that carries job
/// completion notifications.
#[derive(Clone)]
pub struct NotificationChannel {
    topic: Arc<dyn NotificationTopic>,
    queue: Arc<dyn MessageQueue>,
}

impl NotificationChannel {
    pub fn new(topic: Arc<dyn NotificationTopic>, queue: Arc<dyn MessageQueue>) -> Self {
        Self { topic, queue }
    }

    /// Create the topic and queue, subscribe the queue and authorize the
    /// topic to deliver into it.
    ///
    /// On failure nothing is rolled back; the error carries whatever was
    /// already created so the caller can pass it to [`Self::cleanup_partial`].
    pub async fn create(
        &self,
        topic_name: &str,
        queue_name: &str,
    ) -> Result<ChannelDescriptor, ChannelError> {
        let mut partial = PartialChannel::default();

        let topic_arn = self
            .topic
            .create_topic(topic_name)
            .await
            .map_err(|e| ChannelError::provision(ProvisionStep::CreateTopic, &partial, e))?;
        partial.topic_arn = Some(topic_arn.clone());

        let queue_url = self
            .queue
            .create_queue(queue_name)
            .await
            .map_err(|e| ChannelError::provision(ProvisionStep::CreateQueue, &partial, e))?;
        partial.queue_url = Some(queue_url.clone());

        let queue_arn = self
            .queue
            .queue_arn(&queue_url)
            .await
            .map_err(|e| ChannelError::provision(ProvisionStep::ReadQueueArn, &partial, e))?;

        self.topic
            .subscribe_queue(&topic_arn, &queue_arn)
            .await
            .map_err(|e| ChannelError::provision(ProvisionStep::Subscribe, &partial, e))?;

        let policy = queue_policy(&queue_arn, &topic_arn);
        self.queue
            .set_policy(&queue_url, &policy)
            .await
            .map_err(|e| ChannelError::provision(ProvisionStep::ApplyPolicy, &partial, e))?;

        tracing::info!(
            topic_arn = %topic_arn,
            queue_url = %queue_url,
            "Notification channel provisioned"
        );

        Ok(ChannelDescriptor {
            topic_arn,
            queue_url,
            queue_arn,
            policy_applied: true,
        })
    }

    /// Delete the queue, then the topic. The topic deletion is attempted even
    /// if the queue deletion failed; the first failure is returned.
    pub async fn delete(&self, channel: &ChannelDescriptor) -> Result<(), ChannelError> {
        self.teardown(Some(&channel.queue_url), Some(&channel.topic_arn))
            .await?;
        tracing::info!(topic_arn = %channel.topic_arn, "Notification channel deleted");
        Ok(())
    }

    /// Remove resources left behind by a failed [`Self::create`].
    pub async fn cleanup_partial(&self, partial: &PartialChannel) -> Result<(), ChannelError> {
        self.teardown(partial.queue_url.as_deref(), partial.topic_arn.as_deref())
            .await
    }

    async fn teardown(
        &self,
        queue_url: Option<&str>,
        topic_arn: Option<&str>,
    ) -> Result<(), ChannelError> {
        let queue_result = match queue_url {
            Some(url) => self.queue.delete_queue(url).await,
            None => Ok(()),
        };
        let topic_result = match topic_arn {
            Some(arn) => self.topic.delete_topic(arn).await,
            None => Ok(()),
        };

        match (queue_result, topic_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(queue_err), topic_result) => {
                if let Err(topic_err) = topic_result {
                    tracing::error!(error = %topic_err, "Topic deletion also failed");
                }
                Err(ChannelError::DeleteQueue(queue_err))
            }
            (Ok(()), Err(topic_err)) => Err(ChannelError::DeleteTopic(topic_err)),
        }
    }
}

/// Queue policy letting the topic (and only the topic, through the
/// `aws:SourceArn` equality condition) send messages to the queue.
pub fn queue_policy(queue_arn: &str, topic_arn: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "AllowTopicDelivery",
            "Effect": "Allow",
            "Principal": { "AWS": "*" },
            "Action": "SQS:SendMessage",
            "Resource": queue_arn,
            "Condition": {
                "ArnEquals": { "aws:SourceArn": topic_arn }
            }
        }]
    })
    .to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel provisioning failed at {step}: {source}")]
    Provision {
        step: ProvisionStep,
        partial: PartialChannel,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to delete notification queue: {0}")]
    DeleteQueue(#[source] QueueError),

    #[error("Failed to delete notification topic: {0}")]
    DeleteTopic(#[source] TopicError),
}

impl ChannelError {
    fn provision(
        step: ProvisionStep,
        partial: &PartialChannel,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        tracing::error!(step = %step, error = %source, "Channel provisioning step failed");
        Self::Provision {
            step,
            partial: partial.clone(),
            source: Box::new(source),
        }
    }

    /// Resources that need manual cleanup, if provisioning failed midway.
    pub fn partial(&self) -> Option<&PartialChannel> {
        match self {
            ChannelError::Provision { partial, .. } if !partial.is_empty() => Some(partial),
            _ => None,
        }
    }
}
