//! Media Analysis Jobs
//!
//! This library runs asynchronous Rekognition Video analysis jobs: it
//! provisions an SNS topic and SQS queue for completion notifications,
//! submits text, label, face and face-search jobs, waits for the matching
//! notification and merges paginated results into one result object.
//! Synchronous single-image detection and result parsing helpers are
//! included for batch callers.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
