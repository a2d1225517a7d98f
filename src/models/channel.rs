use serde::{Deserialize, Serialize};

/// A provisioned SNS topic plus the SQS queue subscribed to it.
///
/// Owned by whoever provisioned it. Must outlive every job submitted
/// against it and must be torn down once that job is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub topic_arn: String,
    pub queue_url: String,
    pub queue_arn: String,
    pub policy_applied: bool,
}

/// Resources created before a provisioning step failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialChannel {
    pub topic_arn: Option<String>,
    pub queue_url: Option<String>,
}

impl PartialChannel {
    pub fn is_empty(&self) -> bool {
        self.topic_arn.is_none() && self.queue_url.is_none()
    }
}

/// Steps of channel provisioning, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProvisionStep {
    CreateTopic,
    CreateQueue,
    ReadQueueArn,
    Subscribe,
    ApplyPolicy,
}
