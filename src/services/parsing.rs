//! Helpers that reduce detection results to the text and identities
//! downstream coding needs.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::detection::{DetectionRecord, FaceSearchResult, TextDetection, TextType};
use crate::models::result::AggregatedResult;

/// Join the LINE detections of an image with `sep`. WORD detections repeat
/// the same text and are skipped.
pub fn line_text(detections: &[TextDetection], sep: &str) -> String {
    detections
        .iter()
        .filter(|text| text.text_type == TextType::Line)
        .map(|text| text.detected_text.as_str())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Join the external image ids of the faces matched in an image.
pub fn matched_persons(result: &FaceSearchResult, sep: &str) -> String {
    result
        .face_matches
        .iter()
        .filter_map(|face_match| face_match.external_image_id.as_deref())
        .collect::<Vec<_>>()
        .join(sep)
}

/// `(timestamp, line)` pairs for every LINE detection of a video, in
/// result order.
pub fn timestamped_lines(result: &AggregatedResult) -> Vec<(i64, String)> {
    result
        .items
        .iter()
        .filter_map(|item| match item {
            DetectionRecord::Text(record) if record.text.text_type == TextType::Line => {
                Some((item.timestamp_ms(), record.text.detected_text.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Lines grouped per timestamp, joined with `sep`, ascending by timestamp.
pub fn lines_by_timestamp(result: &AggregatedResult, sep: &str) -> Vec<(i64, String)> {
    let mut grouped: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (timestamp, line) in timestamped_lines(result) {
        grouped.entry(timestamp).or_default().push(line);
    }

    grouped
        .into_iter()
        .map(|(timestamp, lines)| (timestamp, lines.join(sep)))
        .collect()
}

/// Video-level text: per-timestamp groups with repeats removed (first
/// occurrence wins), joined with `sep_ts`.
pub fn unique_lines(result: &AggregatedResult, sep: &str, sep_ts: &str) -> String {
    let mut seen = HashSet::new();
    lines_by_timestamp(result, sep)
        .into_iter()
        .map(|(_, text)| text)
        .filter(|text| seen.insert(text.clone()))
        .collect::<Vec<_>>()
        .join(sep_ts)
}

/// Distinct external image ids matched anywhere in a face search result.
pub fn candidate_matches(result: &AggregatedResult) -> Vec<String> {
    person_matches(result)
        .map(|(_, id)| id.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Timestamps at which each matched external image id appears.
pub fn candidate_appearances(result: &AggregatedResult) -> BTreeMap<String, Vec<i64>> {
    let mut appearances: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (timestamp, id) in person_matches(result) {
        appearances.entry(id.to_string()).or_default().push(timestamp);
    }
    appearances
}

fn person_matches(result: &AggregatedResult) -> impl Iterator<Item = (i64, &str)> {
    result.items.iter().flat_map(|item| {
        let matches: Vec<(i64, &str)> = match item {
            DetectionRecord::Person(record) => record
                .face_matches
                .iter()
                .filter_map(|face_match| {
                    face_match
                        .external_image_id
                        .as_deref()
                        .map(|id| (item.timestamp_ms(), id))
                })
                .collect(),
            _ => Vec::new(),
        };
        matches.into_iter()
    })
}
