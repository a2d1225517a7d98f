pub mod channel;
pub mod image;
pub mod orchestrator;
pub mod paginator;
pub mod parsing;
pub mod pipeline;
pub mod queue;
pub mod rekognition;
pub mod storage;
pub mod topic;
pub mod watcher;
