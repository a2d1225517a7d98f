//! In-memory doubles for the provider capability traits.
//!
//! Every double appends to a shared [`CallLog`] so tests can assert on the
//! exact order of provider calls across the topic and the queue.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use media_analysis_jobs::models::detection::{FaceDetail, FaceSearchResult, TextDetection};
use media_analysis_jobs::models::job::JobRequest;
use media_analysis_jobs::models::notification::QueueMessage;
use media_analysis_jobs::models::result::{PageRequest, ResultPage};
use media_analysis_jobs::services::image::{DetectError, ImageDetector, ImageSource};
use media_analysis_jobs::services::orchestrator::JobSubmitter;
use media_analysis_jobs::services::paginator::ResultFetcher;
use media_analysis_jobs::services::queue::{MessageQueue, QueueError};
use media_analysis_jobs::services::rekognition::ProviderError;
use media_analysis_jobs::services::topic::{NotificationTopic, TopicError};

pub const TOPIC_ARN: &str = "arn:aws:sns:us-east-1:123456789012:media-analysis";
pub const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/media-analysis";
pub const QUEUE_ARN: &str = "arn:aws:sqs:us-east-1:123456789012:media-analysis";

/// Ordered record of provider calls, e.g. `"sqs:delete_queue"`.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }
}

/// Set of operation names that should fail.
#[derive(Default)]
pub struct Failures(Mutex<HashSet<&'static str>>);

impl Failures {
    pub fn set(&self, operation: &'static str) {
        self.0.lock().unwrap().insert(operation);
    }

    fn check(&self, operation: &'static str) -> bool {
        self.0.lock().unwrap().contains(operation)
    }
}

pub struct FakeTopic {
    pub log: CallLog,
    pub failures: Failures,
}

impl FakeTopic {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failures: Failures::default(),
        }
    }

    fn call(&self, operation: &'static str) -> Result<(), TopicError> {
        self.log.push(format!("sns:{operation}"));
        if self.failures.check(operation) {
            return Err(TopicError::Sdk {
                operation,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationTopic for FakeTopic {
    async fn create_topic(&self, _name: &str) -> Result<String, TopicError> {
        self.call("create_topic")?;
        Ok(TOPIC_ARN.to_string())
    }

    async fn subscribe_queue(&self, topic_arn: &str, queue_arn: &str) -> Result<(), TopicError> {
        assert_eq!(topic_arn, TOPIC_ARN);
        assert_eq!(queue_arn, QUEUE_ARN);
        self.call("subscribe")
    }

    async fn delete_topic(&self, _topic_arn: &str) -> Result<(), TopicError> {
        self.call("delete_topic")
    }
}

/// Queue serving scripted receive batches. Once the script runs out every
/// receive returns an empty batch.
pub struct FakeQueue {
    pub log: CallLog,
    pub failures: Failures,
    batches: Mutex<VecDeque<Vec<QueueMessage>>>,
    deleted: Mutex<Vec<String>>,
    undeletable: Mutex<HashSet<String>>,
    policy: Mutex<Option<String>>,
}

impl FakeQueue {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failures: Failures::default(),
            batches: Mutex::new(VecDeque::new()),
            deleted: Mutex::new(Vec::new()),
            undeletable: Mutex::new(HashSet::new()),
            policy: Mutex::new(None),
        }
    }

    pub fn push_batch(&self, batch: Vec<QueueMessage>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    /// Receipt handles deleted, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Make deletion of one message fail.
    pub fn fail_delete_of(&self, receipt_handle: &str) {
        self.undeletable.lock().unwrap().insert(receipt_handle.to_string());
    }

    pub fn policy(&self) -> Option<String> {
        self.policy.lock().unwrap().clone()
    }

    fn call(&self, operation: &'static str) -> Result<(), QueueError> {
        self.log.push(format!("sqs:{operation}"));
        if self.failures.check(operation) {
            return Err(QueueError::Sdk {
                operation,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn create_queue(&self, _name: &str) -> Result<String, QueueError> {
        self.call("create_queue")?;
        Ok(QUEUE_URL.to_string())
    }

    async fn queue_arn(&self, _queue_url: &str) -> Result<String, QueueError> {
        self.call("queue_arn")?;
        Ok(QUEUE_ARN.to_string())
    }

    async fn set_policy(&self, _queue_url: &str, policy: &str) -> Result<(), QueueError> {
        self.call("set_policy")?;
        *self.policy.lock().unwrap() = Some(policy.to_string());
        Ok(())
    }

    async fn receive(
        &self,
        _queue_url: &str,
        _max_messages: i32,
        _wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        self.call("receive")?;
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn delete_message(&self, _queue_url: &str, receipt_handle: &str) -> Result<(), QueueError> {
        self.call("delete_message")?;
        if self.undeletable.lock().unwrap().contains(receipt_handle) {
            return Err(QueueError::Sdk {
                operation: "delete_message",
                message: "receipt handle expired".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }

    async fn delete_queue(&self, _queue_url: &str) -> Result<(), QueueError> {
        self.call("delete_queue")
    }
}

/// Submitter issuing sequential job ids and recording every request.
#[derive(Default)]
pub struct FakeSubmitter {
    requests: Mutex<Vec<JobRequest>>,
    pub fail: Mutex<bool>,
}

impl FakeSubmitter {
    pub fn requests(&self) -> Vec<JobRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSubmitter for FakeSubmitter {
    async fn submit(&self, request: &JobRequest) -> Result<String, ProviderError> {
        if *self.fail.lock().unwrap() {
            return Err(ProviderError::Sdk {
                operation: "StartJob",
                message: "throttled".to_string(),
            });
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(format!("job-{}", requests.len()))
    }
}

/// Fetcher returning scripted pages, then failing.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<VecDeque<ResultPage>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<ResultPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultFetcher for ScriptedFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ResultPage, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ProviderError::MissingField("scripted page"))
    }
}

/// Fetcher whose every page points to another page.
#[derive(Default)]
pub struct EndlessFetcher {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl ResultFetcher for EndlessFetcher {
    async fn fetch_page(&self, _request: &PageRequest) -> Result<ResultPage, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        Ok(ResultPage {
            next_token: Some(format!("t{calls}")),
            items: Vec::new(),
            terminal: None,
        })
    }
}

/// Image detector with one canned response per operation.
pub struct FakeDetector {
    pub text: Mutex<Option<Result<Vec<TextDetection>, DetectError>>>,
    pub faces: Mutex<Option<Result<Vec<FaceDetail>, DetectError>>>,
    pub search: Mutex<Option<Result<FaceSearchResult, DetectError>>>,
}

impl FakeDetector {
    pub fn failing() -> Self {
        let fault = || {
            DetectError::Provider(ProviderError::Sdk {
                operation: "Detect",
                message: "access denied".to_string(),
            })
        };
        Self {
            text: Mutex::new(Some(Err(fault()))),
            faces: Mutex::new(Some(Err(fault()))),
            search: Mutex::new(Some(Err(fault()))),
        }
    }
}

#[async_trait]
impl ImageDetector for FakeDetector {
    async fn detect_text(&self, _image: &ImageSource) -> Result<Vec<TextDetection>, DetectError> {
        self.text.lock().unwrap().take().expect("detect_text response")
    }

    async fn detect_faces(&self, _image: &ImageSource) -> Result<Vec<FaceDetail>, DetectError> {
        self.faces.lock().unwrap().take().expect("detect_faces response")
    }

    async fn search_faces(
        &self,
        _image: &ImageSource,
        _collection_id: &str,
        _max_faces: i32,
        _match_threshold: f32,
    ) -> Result<FaceSearchResult, DetectError> {
        self.search.lock().unwrap().take().expect("search_faces response")
    }
}
