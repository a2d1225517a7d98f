use media_analysis_jobs::{
    app_state::AppState,
    config::AppConfig,
    models::job::MediaRef,
    services::{
        image::{ImageAnalyzer, ImageSource, DEFAULT_MAX_FACES},
        parsing,
    },
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Detections for one image. `None` fields mean the call soft-failed or
/// found nothing.
#[derive(Debug, Serialize)]
struct ImageSummary {
    key: String,
    text: Option<String>,
    face_count: Option<usize>,
    matched_persons: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting image detection batch");

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Image batch failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    if config.image_keys.is_empty() {
        return Err("IMAGE_KEYS is empty".into());
    }

    let state = AppState::from_config(&config).await?;
    let analyzer = state.image_analyzer();

    let mut processed = 0usize;
    for key in &config.image_keys {
        let summary = process_image(&analyzer, &config, key).await;

        if let Some(store) = &state.results {
            // A failed upload is reported but does not stop the batch.
            if let Err(e) = store.upload_json(&store.image_result_key(key), &summary).await {
                tracing::error!(key = %key, error = %e, "Failed to store image summary");
            }
        }
        println!("{}", serde_json::to_string(&summary)?);
        processed += 1;
    }

    tracing::info!(images = processed, "Image batch complete");
    Ok(())
}

async fn process_image(analyzer: &ImageAnalyzer, config: &AppConfig, key: &str) -> ImageSummary {
    let image = ImageSource::Stored(MediaRef::new(&config.media_bucket, key));

    tracing::debug!(key = %key, "Detecting text");
    let text = analyzer
        .detect_text(&image, key)
        .await
        .map(|detections| parsing::line_text(&detections, ";"));

    tracing::debug!(key = %key, "Detecting faces");
    let face_count = analyzer.detect_faces(&image, key).await.map(|faces| faces.len());

    let matched_persons = match &config.collection_id {
        Some(collection_id) => analyzer
            .search_faces(
                &image,
                key,
                collection_id,
                DEFAULT_MAX_FACES,
                config.match_threshold,
            )
            .await
            .map(|result| parsing::matched_persons(&result, ";")),
        None => None,
    };

    tracing::info!(
        key = %key,
        has_text = text.is_some(),
        face_count = face_count.unwrap_or(0),
        "Image processed"
    );

    ImageSummary {
        key: key.to_string(),
        text,
        face_count,
        matched_persons,
    }
}
