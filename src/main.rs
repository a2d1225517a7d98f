use std::net::SocketAddr;

use media_analysis_jobs::{
    app_state::AppState,
    config::AppConfig,
    models::job::{FaceOptions, FaceSearchOptions, JobKind, LabelOptions, MediaRef},
    models::result::AggregatedResult,
    services::{
        parsing,
        pipeline::{JobOutcome, JobSpec},
    },
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration from environment");
            std::process::exit(1);
        }
    };

    if let Some(addr) = &config.metrics_addr {
        if let Err(e) = install_metrics(addr) {
            tracing::error!(error = %e, "Failed to start Prometheus exporter");
            std::process::exit(1);
        }
    }

    match run(&config).await {
        Ok(outcome) if outcome.teardown_error.is_some() => {
            tracing::error!(
                job_id = %outcome.handle.job_id,
                "Analysis finished but the notification channel was left behind"
            );
            std::process::exit(1);
        }
        Ok(outcome) if outcome.completion.succeeded() => {
            tracing::info!(job_id = %outcome.handle.job_id, "Analysis finished");
        }
        Ok(outcome) => {
            tracing::warn!(
                job_id = %outcome.handle.job_id,
                completion = ?outcome.completion,
                "Analysis did not succeed"
            );
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "Analysis run failed");
            std::process::exit(1);
        }
    }
}

fn install_metrics(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = addr.parse()?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(
        "analysis_jobs_submitted_total",
        "Total analysis jobs submitted"
    );
    metrics::describe_counter!(
        "analysis_notifications_discarded_total",
        "Queue notifications discarded because they belong to another job"
    );
    metrics::describe_counter!(
        "analysis_result_pages_total",
        "Result pages retrieved"
    );
    metrics::describe_histogram!(
        "analysis_job_duration_seconds",
        "Time from submission wait start to completion notification"
    );
    metrics::describe_counter!(
        "image_detection_failures_total",
        "Synchronous image detection calls that soft-failed"
    );

    tracing::info!(addr = %addr, "Prometheus exporter listening");
    Ok(())
}

async fn run(config: &AppConfig) -> Result<JobOutcome, Box<dyn std::error::Error>> {
    let role_arn = config.role_arn.as_deref().ok_or("ROLE_ARN is not set")?;
    let video_key = config.video_key.as_deref().ok_or("VIDEO_KEY is not set")?;
    let media = MediaRef::new(&config.media_bucket, video_key);
    let spec = job_spec(config)?;

    tracing::info!(
        bucket = %media.bucket,
        key = %media.key,
        kind = %config.job_kind,
        "Starting media analysis"
    );

    let state = AppState::from_config(config).await?;
    let pipeline = state.pipeline(config, role_arn);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let (topic_name, queue_name) = config.channel_names();
    let outcome = pipeline
        .run(&media, &spec, &topic_name, &queue_name, &cancel)
        .await?;

    if let Some(result) = &outcome.result {
        summarize(result);

        match &state.results {
            Some(store) => {
                let key = store.result_key(&outcome.handle);
                store.upload_json(&key, result).await?;
                tracing::info!(key = %key, "Results stored");
            }
            None => println!("{}", serde_json::to_string_pretty(result)?),
        }
    }

    Ok(outcome)
}

fn job_spec(config: &AppConfig) -> Result<JobSpec, Box<dyn std::error::Error>> {
    Ok(match config.job_kind {
        JobKind::Text => JobSpec::Text,
        JobKind::Label => JobSpec::Label(LabelOptions {
            min_confidence: config.min_confidence,
        }),
        JobKind::Face => JobSpec::Face(FaceOptions::default()),
        JobKind::FaceSearch => JobSpec::FaceSearch(FaceSearchOptions {
            collection_id: config
                .collection_id
                .clone()
                .ok_or("COLLECTION_ID is required for face search")?,
            match_threshold: config.match_threshold,
        }),
    })
}

fn summarize(result: &AggregatedResult) {
    match result.kind {
        JobKind::Text => tracing::info!(
            job_id = %result.job_id,
            text = %parsing::unique_lines(result, "\n", ";"),
            "Video text"
        ),
        JobKind::FaceSearch => tracing::info!(
            job_id = %result.job_id,
            candidates = ?parsing::candidate_matches(result),
            "Matched candidates"
        ),
        _ => tracing::info!(
            job_id = %result.job_id,
            items = result.items.len(),
            "Detections retrieved"
        ),
    }
}
