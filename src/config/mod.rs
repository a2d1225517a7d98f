use std::time::Duration;

use serde::Deserialize;

use crate::models::job::JobKind;
use crate::services::paginator::PaginationLimits;
use crate::services::watcher::WatchConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// AWS region (e.g., "us-east-1"). Falls back to the SDK's region chain.
    pub aws_region: Option<String>,

    /// IAM role Rekognition assumes to publish to the notification topic.
    /// Required by the media-analysis binary only.
    pub role_arn: Option<String>,

    /// Bucket holding the media to analyze
    pub media_bucket: String,

    /// Object key of the video to analyze (media-analysis binary)
    pub video_key: Option<String>,

    /// Analysis to run: TEXT, LABEL, FACE or FACE_SEARCH
    #[serde(default = "default_job_kind")]
    pub job_kind: JobKind,

    /// Face collection searched by face_search jobs and image face search
    pub collection_id: Option<String>,

    /// Face match threshold, percent
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,

    /// Minimum label confidence, percent
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Topic name; generated per run when unset
    pub topic_name: Option<String>,

    /// Queue name; generated per run when unset
    pub queue_name: Option<String>,

    /// Bucket receiving result JSON. Results are only logged when unset.
    pub results_bucket: Option<String>,

    #[serde(default = "default_results_prefix")]
    pub results_prefix: String,

    /// S3-compatible endpoint override for the results bucket
    pub s3_endpoint: Option<String>,

    /// Maximum wait for the completion notification (0 disables the limit)
    #[serde(default = "default_watch_timeout_secs")]
    pub watch_timeout_secs: u64,

    /// Long-poll wait per receive call
    #[serde(default = "default_poll_wait_secs")]
    pub poll_wait_secs: u64,

    /// Pause after an empty receive
    #[serde(default = "default_idle_delay_secs")]
    pub idle_delay_secs: u64,

    /// Maximum result pages fetched for one job
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum time spent paging through one job's results (0 disables the limit)
    #[serde(default = "default_max_fetch_secs")]
    pub max_fetch_secs: u64,

    /// Image keys in `media_bucket` processed by the image-batch binary
    #[serde(default)]
    pub image_keys: Vec<String>,

    /// Prometheus exporter listen address (e.g., "0.0.0.0:9000")
    pub metrics_addr: Option<String>,
}

fn default_job_kind() -> JobKind {
    JobKind::Text
}

fn default_match_threshold() -> f32 {
    80.0
}

fn default_min_confidence() -> f32 {
    90.0
}

fn default_results_prefix() -> String {
    "results".to_string()
}

fn default_watch_timeout_secs() -> u64 {
    3600
}

fn default_poll_wait_secs() -> u64 {
    20
}

fn default_idle_delay_secs() -> u64 {
    5
}

fn default_max_pages() -> usize {
    1000
}

fn default_max_fetch_secs() -> u64 {
    900
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            wait_time: Duration::from_secs(self.poll_wait_secs),
            idle_delay: Duration::from_secs(self.idle_delay_secs),
            timeout: (self.watch_timeout_secs > 0)
                .then(|| Duration::from_secs(self.watch_timeout_secs)),
            ..WatchConfig::default()
        }
    }

    pub fn pagination_limits(&self) -> PaginationLimits {
        PaginationLimits {
            max_pages: self.max_pages,
            max_elapsed: (self.max_fetch_secs > 0)
                .then(|| Duration::from_secs(self.max_fetch_secs)),
        }
    }

    /// Topic and queue names for one run.
    pub fn channel_names(&self) -> (String, String) {
        let generated = format!("media-analysis-{}", uuid::Uuid::new_v4().simple());
        (
            self.topic_name.clone().unwrap_or_else(|| generated.clone()),
            self.queue_name.clone().unwrap_or(generated),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(vars: &[(&str, &str)]) -> AppConfig {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(&[
            ("ROLE_ARN", "arn:aws:iam::123456789012:role/rekognition"),
            ("MEDIA_BUCKET", "ads"),
        ]);

        assert_eq!(config.job_kind, JobKind::Text);
        assert_eq!(config.min_confidence, 90.0);
        assert_eq!(config.max_pages, 1000);
        assert!(config.image_keys.is_empty());
        assert_eq!(config.watch_config().timeout, Some(Duration::from_secs(3600)));
        assert_eq!(
            config.pagination_limits().max_elapsed,
            Some(Duration::from_secs(900))
        );
    }

    #[test]
    fn test_pagination_limits_parsed() {
        let config = parse(&[
            ("MEDIA_BUCKET", "ads"),
            ("MAX_PAGES", "50"),
            ("MAX_FETCH_SECS", "120"),
        ]);
        let limits = config.pagination_limits();
        assert_eq!(limits.max_pages, 50);
        assert_eq!(limits.max_elapsed, Some(Duration::from_secs(120)));

        let unbounded = parse(&[("MEDIA_BUCKET", "ads"), ("MAX_FETCH_SECS", "0")]);
        assert_eq!(unbounded.pagination_limits().max_elapsed, None);
    }

    #[test]
    fn test_kind_and_image_keys_parsed() {
        let config = parse(&[
            ("ROLE_ARN", "arn:aws:iam::123456789012:role/rekognition"),
            ("MEDIA_BUCKET", "ads"),
            ("JOB_KIND", "FACE_SEARCH"),
            ("IMAGE_KEYS", "a.png,b.png"),
            ("WATCH_TIMEOUT_SECS", "0"),
        ]);

        assert_eq!(config.job_kind, JobKind::FaceSearch);
        assert_eq!(config.image_keys, vec!["a.png", "b.png"]);
        assert_eq!(config.watch_config().timeout, None);
    }

    #[test]
    fn test_generated_channel_names_match() {
        let config = parse(&[
            ("ROLE_ARN", "arn:aws:iam::123456789012:role/rekognition"),
            ("MEDIA_BUCKET", "ads"),
        ]);
        let (topic, queue) = config.channel_names();
        assert_eq!(topic, queue);
        assert!(topic.starts_with("media-analysis-"));
    }
}
