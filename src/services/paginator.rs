use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::models::job::JobHandle;
use crate::models::result::{AggregatedResult, PageRequest, ResultPage, RetrievalOptions};

use super::rekognition::ProviderError;

/// Retrieves one page of a job's results.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ResultPage, ProviderError>;
}

/// Bounds on a single pagination run.
#[derive(Debug, Clone)]
pub struct PaginationLimits {
    pub max_pages: usize,
    pub max_elapsed: Option<Duration>,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            max_pages: 1000,
            max_elapsed: Some(Duration::from_secs(900)),
        }
    }
}

/// Drains every page of a finished job into one [`AggregatedResult`].
#[derive(Clone)]
pub struct ResultPaginator {
    fetcher: Arc<dyn ResultFetcher>,
    limits: PaginationLimits,
}

impl ResultPaginator {
    pub fn new(fetcher: Arc<dyn ResultFetcher>, limits: PaginationLimits) -> Self {
        Self { fetcher, limits }
    }

    /// Fetch pages until one arrives without a continuation token.
    ///
    /// Items keep page order and within-page order. Job status and video
    /// metadata come from the final page only.
    pub async fn fetch(&self, handle: &JobHandle) -> Result<AggregatedResult, FetchError> {
        let started = Instant::now();
        let options = RetrievalOptions::for_kind(handle.kind);
        let mut next_token: Option<String> = None;
        let mut items = Vec::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.limits.max_pages {
                return Err(FetchError::PageLimitExceeded { pages });
            }
            if let Some(limit) = self.limits.max_elapsed {
                if started.elapsed() > limit {
                    return Err(FetchError::TimeLimitExceeded { pages, limit });
                }
            }

            let request = PageRequest {
                job_id: handle.job_id.clone(),
                kind: handle.kind,
                next_token: next_token.take(),
                options,
            };
            let page = self.fetcher.fetch_page(&request).await?;
            pages += 1;

            metrics::counter!("analysis_result_pages_total", "kind" => handle.kind.to_string())
                .increment(1);
            tracing::debug!(
                job_id = %handle.job_id,
                page = pages,
                items = page.items.len(),
                "Fetched result page"
            );

            let continuation = page.continuation().map(str::to_string);
            items.extend(page.items);

            match continuation {
                Some(token) => next_token = Some(token),
                None => {
                    let terminal = page.terminal.ok_or(FetchError::MissingTerminalStatus {
                        job_id: handle.job_id.clone(),
                    })?;

                    tracing::info!(
                        job_id = %handle.job_id,
                        kind = %handle.kind,
                        pages,
                        items = items.len(),
                        job_status = %terminal.job_status,
                        "Results retrieved"
                    );

                    return Ok(AggregatedResult {
                        job_id: handle.job_id.clone(),
                        kind: handle.kind,
                        job_status: terminal.job_status,
                        video_metadata: terminal.video_metadata,
                        items,
                    });
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Result retrieval failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Result still paginating after {pages} pages")]
    PageLimitExceeded { pages: usize },

    #[error("Result still paginating after {limit:?} ({pages} pages)")]
    TimeLimitExceeded { pages: usize, limit: Duration },

    #[error("Final result page for job {job_id} has no job status")]
    MissingTerminalStatus { job_id: String },
}
