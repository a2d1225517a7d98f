mod helpers;

use std::sync::{Arc, Mutex};

use helpers::FakeDetector;
use media_analysis_jobs::models::detection::{
    FaceDetail, FaceMatch, FaceSearchResult, TextDetection, TextType,
};
use media_analysis_jobs::models::job::MediaRef;
use media_analysis_jobs::services::image::{DetectError, ImageAnalyzer, ImageSource, DEFAULT_MAX_FACES};
use media_analysis_jobs::services::parsing::{line_text, matched_persons};

fn image() -> ImageSource {
    ImageSource::Stored(MediaRef::new("media", "flyers/flyer-01.png"))
}

fn text(detected: &str, text_type: TextType) -> TextDetection {
    TextDetection {
        detected_text: detected.to_string(),
        text_type,
        id: None,
        parent_id: None,
        confidence: Some(99.0),
        bounding_box: None,
    }
}

fn detector() -> FakeDetector {
    FakeDetector {
        text: Mutex::new(None),
        faces: Mutex::new(None),
        search: Mutex::new(None),
    }
}

#[tokio::test]
async fn test_provider_failures_become_none() {
    let analyzer = ImageAnalyzer::new(Arc::new(FakeDetector::failing()));

    assert!(analyzer.detect_text(&image(), "flyer-01.png").await.is_none());
    assert!(analyzer.detect_faces(&image(), "flyer-01.png").await.is_none());
    assert!(analyzer
        .search_faces(&image(), "flyer-01.png", "candidates", DEFAULT_MAX_FACES, 80.0)
        .await
        .is_none());
}

#[tokio::test]
async fn test_no_face_in_image_is_soft() {
    let fake = detector();
    *fake.search.lock().unwrap() = Some(Err(DetectError::NoFace("flyer-01.png".to_string())));
    let analyzer = ImageAnalyzer::new(Arc::new(fake));

    let result = analyzer
        .search_faces(&image(), "flyer-01.png", "candidates", DEFAULT_MAX_FACES, 80.0)
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_empty_face_list_reported_as_none() {
    let fake = detector();
    *fake.faces.lock().unwrap() = Some(Ok(Vec::new()));
    let analyzer = ImageAnalyzer::new(Arc::new(fake));

    assert!(analyzer.detect_faces(&image(), "flyer-01.png").await.is_none());
}

#[tokio::test]
async fn test_detected_faces_returned() {
    let fake = detector();
    *fake.faces.lock().unwrap() = Some(Ok(vec![FaceDetail::default(), FaceDetail::default()]));
    let analyzer = ImageAnalyzer::new(Arc::new(fake));

    let faces = analyzer.detect_faces(&image(), "flyer-01.png").await.unwrap();
    assert_eq!(faces.len(), 2);
}

#[tokio::test]
async fn test_text_and_matches_reduce_to_strings() {
    let fake = detector();
    *fake.text.lock().unwrap() = Some(Ok(vec![
        text("RE-ELECT", TextType::Line),
        text("RE-ELECT", TextType::Word),
        text("JANE DOE", TextType::Line),
    ]));
    *fake.search.lock().unwrap() = Some(Ok(FaceSearchResult {
        face_matches: vec![
            FaceMatch {
                similarity: Some(98.1),
                face_id: Some("f-1".to_string()),
                external_image_id: Some("jane_doe".to_string()),
            },
            FaceMatch {
                similarity: Some(91.4),
                face_id: Some("f-2".to_string()),
                external_image_id: None,
            },
        ],
        searched_face_bounding_box: None,
        searched_face_confidence: Some(99.9),
    }));
    let analyzer = ImageAnalyzer::new(Arc::new(fake));

    let detections = analyzer.detect_text(&image(), "flyer-01.png").await.unwrap();
    assert_eq!(line_text(&detections, " "), "RE-ELECT JANE DOE");

    let matches = analyzer
        .search_faces(&image(), "flyer-01.png", "candidates", DEFAULT_MAX_FACES, 80.0)
        .await
        .unwrap();
    assert_eq!(matched_persons(&matches, ","), "jane_doe");
}
