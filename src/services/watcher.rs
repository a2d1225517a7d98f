use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::channel::ChannelDescriptor;
use crate::models::job::{JobHandle, JobStatus};
use crate::models::notification::{EnvelopeError, NotificationMessage, QueueMessage};

use super::queue::{MessageQueue, QueueError, MAX_BATCH_SIZE};

/// Polling behaviour of the completion watcher.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Messages requested per receive call.
    pub batch_size: i32,
    /// Long-poll wait passed to the queue.
    pub wait_time: Duration,
    /// Pause after an empty receive.
    pub idle_delay: Duration,
    /// Give up after this long. `None` waits until cancelled.
    pub timeout: Option<Duration>,
    /// Emit a liveness log line every N empty receives.
    pub liveness_every: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            wait_time: Duration::from_secs(20),
            idle_delay: Duration::from_secs(5),
            timeout: None,
            liveness_every: 12,
        }
    }
}

/// How waiting for a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// The job finished with a status other than `SUCCEEDED`.
    Failed(JobStatus),
    TimedOut,
    Cancelled,
}

impl Completion {
    pub fn succeeded(&self) -> bool {
        matches!(self, Completion::Succeeded)
    }
}

/// Consumes the notification queue until the notification for one job
/// arrives.
///
/// Every message received is deleted, whether it belongs to the tracked job
/// or not. A channel therefore serves exactly one in-flight job: a second job
/// sharing the queue would have its notification discarded here.
#[derive(Clone)]
pub struct CompletionWatcher {
    queue: Arc<dyn MessageQueue>,
    config: WatchConfig,
}

impl CompletionWatcher {
    pub fn new(queue: Arc<dyn MessageQueue>, config: WatchConfig) -> Self {
        Self { queue, config }
    }

    /// Block until the job's completion notification is consumed, the
    /// configured timeout expires or `cancel` fires.
    pub async fn await_completion(
        &self,
        channel: &ChannelDescriptor,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<Completion, WatchError> {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);
        let mut idle_polls: u64 = 0;

        tracing::info!(job_id = %handle.job_id, kind = %handle.kind, "Waiting for job completion");

        loop {
            let messages = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.interrupted(handle, Completion::Cancelled)),
                _ = wait_until(deadline) => return Ok(self.interrupted(handle, Completion::TimedOut)),
                received = self.queue.receive(
                    &channel.queue_url,
                    self.config.batch_size,
                    self.config.wait_time,
                ) => received?,
            };

            if messages.is_empty() {
                idle_polls += 1;
                if self.config.liveness_every > 0 && idle_polls % self.config.liveness_every == 0 {
                    tracing::info!(
                        job_id = %handle.job_id,
                        waited_secs = started.elapsed().as_secs(),
                        "Still waiting for job completion"
                    );
                } else {
                    tracing::trace!(job_id = %handle.job_id, "No notifications");
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(self.interrupted(handle, Completion::Cancelled)),
                    _ = wait_until(deadline) => return Ok(self.interrupted(handle, Completion::TimedOut)),
                    _ = sleep(self.config.idle_delay) => {}
                }
                continue;
            }

            if let Some(outcome) = self.consume_batch(channel, handle, messages).await? {
                metrics::histogram!("analysis_job_duration_seconds", "kind" => handle.kind.to_string())
                    .record(started.elapsed().as_secs_f64());
                return Ok(outcome);
            }
        }
    }

    /// Delete every message in the batch; report the outcome of the first
    /// one matching the tracked job.
    ///
    /// Once the tracked job's notification has been consumed, failures on
    /// the rest of the batch are logged and the outcome is still returned.
    /// Messages that fail there stay on the queue.
    async fn consume_batch(
        &self,
        channel: &ChannelDescriptor,
        handle: &JobHandle,
        messages: Vec<QueueMessage>,
    ) -> Result<Option<Completion>, WatchError> {
        let mut outcome = None;

        for message in messages {
            match self.consume(channel, handle, &message, outcome.is_none()).await {
                Ok(Some(completion)) => outcome = Some(completion),
                Ok(None) => {}
                Err(e) if outcome.is_some() => {
                    tracing::warn!(
                        job_id = %handle.job_id,
                        message_id = ?message.message_id,
                        error = %e,
                        "Failed to consume notification after job completed"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    /// Parse and delete one message. Returns the completion when it is the
    /// first notification for the tracked job (`tracking` still set).
    async fn consume(
        &self,
        channel: &ChannelDescriptor,
        handle: &JobHandle,
        message: &QueueMessage,
        tracking: bool,
    ) -> Result<Option<Completion>, WatchError> {
        let notification =
            NotificationMessage::parse(message).map_err(|source| WatchError::MalformedEnvelope {
                message_id: message.message_id.clone(),
                source,
            })?;

        self.queue
            .delete_message(&channel.queue_url, &notification.receipt_handle)
            .await?;

        if tracking && notification.job_id == handle.job_id {
            tracing::info!(
                job_id = %handle.job_id,
                status = %notification.status,
                "Matching job notification received"
            );
            return Ok(Some(match notification.status {
                JobStatus::Succeeded => Completion::Succeeded,
                other => Completion::Failed(other),
            }));
        }

        metrics::counter!("analysis_notifications_discarded_total").increment(1);
        tracing::warn!(
            received_job_id = %notification.job_id,
            tracked_job_id = %handle.job_id,
            status = %notification.status,
            "Discarding notification that does not complete the tracked job"
        );
        Ok(None)
    }

    fn interrupted(&self, handle: &JobHandle, outcome: Completion) -> Completion {
        tracing::warn!(job_id = %handle.job_id, outcome = ?outcome, "Stopped waiting for job");
        outcome
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Notification queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Malformed notification (message {message_id:?}): {source}")]
    MalformedEnvelope {
        message_id: Option<String>,
        #[source]
        source: EnvelopeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_succeeded_counts_as_success() {
        assert!(Completion::Succeeded.succeeded());
        assert!(!Completion::Failed(JobStatus::Failed).succeeded());
        assert!(!Completion::Failed(JobStatus::Error).succeeded());
        assert!(!Completion::TimedOut.succeeded());
        assert!(!Completion::Cancelled.succeeded());
    }
}
