#![allow(dead_code)]

pub mod clock;
pub mod publisher;
pub mod summarizer;
pub mod task_source;
pub mod transcript_fetcher;

use std::sync::{Arc, Mutex};

/// Ordered record of calls made across all mocks
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}
