use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};

use crate::config::AppConfig;
use crate::services::{
    channel::NotificationChannel,
    image::ImageAnalyzer,
    orchestrator::JobOrchestrator,
    paginator::ResultPaginator,
    pipeline::AnalysisPipeline,
    queue::SqsQueue,
    rekognition::RekognitionClient,
    storage::{ResultStore, StorageError},
    topic::SnsTopic,
    watcher::CompletionWatcher,
};

/// AWS clients shared by the binaries.
#[derive(Clone)]
pub struct AppState {
    pub rekognition: Arc<RekognitionClient>,
    pub queue: Arc<SqsQueue>,
    pub topic: Arc<SnsTopic>,
    pub results: Option<Arc<ResultStore>>,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> Result<Self, StorageError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let results = match &config.results_bucket {
            Some(bucket) => {
                let region = sdk_config
                    .region()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "us-east-1".to_string());
                Some(Arc::new(ResultStore::new(
                    bucket,
                    &region,
                    config.s3_endpoint.as_deref(),
                    &config.results_prefix,
                )?))
            }
            None => None,
        };

        Ok(Self {
            rekognition: Arc::new(RekognitionClient::new(&sdk_config)),
            queue: Arc::new(SqsQueue::new(&sdk_config)),
            topic: Arc::new(SnsTopic::new(&sdk_config)),
            results,
        })
    }

    pub fn pipeline(&self, config: &AppConfig, role_arn: &str) -> AnalysisPipeline {
        AnalysisPipeline {
            channel: NotificationChannel::new(self.topic.clone(), self.queue.clone()),
            orchestrator: JobOrchestrator::new(self.rekognition.clone(), role_arn),
            watcher: CompletionWatcher::new(self.queue.clone(), config.watch_config()),
            paginator: ResultPaginator::new(self.rekognition.clone(), config.pagination_limits()),
        }
    }

    pub fn image_analyzer(&self) -> ImageAnalyzer {
        ImageAnalyzer::new(self.rekognition.clone())
    }
}
