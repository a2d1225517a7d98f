use tokio_util::sync::CancellationToken;

use crate::models::channel::ChannelDescriptor;
use crate::models::job::{FaceOptions, FaceSearchOptions, JobHandle, LabelOptions, MediaRef};
use crate::models::result::AggregatedResult;

use super::channel::{ChannelError, NotificationChannel};
use super::orchestrator::{JobOrchestrator, SubmitError};
use super::paginator::{FetchError, ResultPaginator};
use super::watcher::{Completion, CompletionWatcher, WatchError};

/// Which analysis to run.
#[derive(Debug, Clone)]
pub enum JobSpec {
    Text,
    Label(LabelOptions),
    Face(FaceOptions),
    FaceSearch(FaceSearchOptions),
}

/// Outcome of one complete job lifecycle.
#[derive(Debug)]
pub struct JobOutcome {
    pub handle: JobHandle,
    pub completion: Completion,
    /// Present only when the job succeeded.
    pub result: Option<AggregatedResult>,
    /// Set when the job ran to completion but the channel could not be
    /// deleted afterwards. Its resources need manual cleanup.
    pub teardown_error: Option<ChannelError>,
}

/// Runs one job end to end on a dedicated notification channel:
/// provision, submit, wait, fetch, tear down.
pub struct AnalysisPipeline {
    pub channel: NotificationChannel,
    pub orchestrator: JobOrchestrator,
    pub watcher: CompletionWatcher,
    pub paginator: ResultPaginator,
}

impl AnalysisPipeline {
    /// The channel is torn down on every path once it exists, and partially
    /// provisioned resources are cleaned up when provisioning fails. A
    /// teardown failure after a completed run is reported on the outcome.
    pub async fn run(
        &self,
        media: &MediaRef,
        spec: &JobSpec,
        topic_name: &str,
        queue_name: &str,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, PipelineError> {
        let descriptor = match self.channel.create(topic_name, queue_name).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                if let Some(partial) = e.partial() {
                    tracing::warn!(
                        topic_arn = ?partial.topic_arn,
                        queue_url = ?partial.queue_url,
                        "Cleaning up partially provisioned channel"
                    );
                    if let Err(cleanup) = self.channel.cleanup_partial(partial).await {
                        tracing::error!(error = %cleanup, "Partial channel cleanup failed");
                    }
                }
                return Err(e.into());
            }
        };

        let outcome = self.track(media, spec, &descriptor, cancel).await;
        let teardown = self.channel.delete(&descriptor).await;

        match (outcome, teardown) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(mut outcome), Err(e)) => {
                tracing::error!(
                    job_id = %outcome.handle.job_id,
                    topic_arn = %descriptor.topic_arn,
                    queue_url = %descriptor.queue_url,
                    error = %e,
                    "Channel teardown failed after job completed"
                );
                outcome.teardown_error = Some(e);
                Ok(outcome)
            }
            (Err(e), teardown) => {
                if let Err(teardown) = teardown {
                    tracing::error!(error = %teardown, "Channel teardown failed");
                }
                Err(e)
            }
        }
    }

    async fn track(
        &self,
        media: &MediaRef,
        spec: &JobSpec,
        channel: &ChannelDescriptor,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, PipelineError> {
        let handle = match spec {
            JobSpec::Text => self.orchestrator.start_text_detection(media, channel).await?,
            JobSpec::Label(options) => {
                self.orchestrator
                    .start_label_detection(media, channel, options)
                    .await?
            }
            JobSpec::Face(options) => {
                self.orchestrator
                    .start_face_detection(media, channel, options)
                    .await?
            }
            JobSpec::FaceSearch(options) => {
                self.orchestrator
                    .start_face_search(
                        media,
                        channel,
                        &options.collection_id,
                        options.match_threshold,
                    )
                    .await?
            }
        };

        let completion = self.watcher.await_completion(channel, &handle, cancel).await?;

        let result = if completion.succeeded() {
            Some(self.paginator.fetch(&handle).await?)
        } else {
            tracing::warn!(job_id = %handle.job_id, completion = ?completion, "Job did not succeed");
            None
        };

        Ok(JobOutcome {
            handle,
            completion,
            result,
            teardown_error: None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
