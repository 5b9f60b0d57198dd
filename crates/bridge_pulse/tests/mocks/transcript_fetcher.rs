use std::sync::{Arc, Mutex};

use bridge_pulse::{
    error::TranscriptError,
    yt::{Transcript, TranscriptFetcher, VideoId},
};

use super::EventLog;

#[derive(Clone)]
pub struct MockTranscriptFetcher {
    pub response_text: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub events: EventLog,
    pub fail_with: Option<String>,
    /// Number of calls that fail before the fetcher starts succeeding
    pub failures_before_success: Arc<Mutex<usize>>,
}

impl MockTranscriptFetcher {
    pub fn new(response_text: &str, events: EventLog) -> Self {
        Self {
            response_text: response_text.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            events,
            fail_with: None,
            failures_before_success: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing(msg: &str, events: EventLog) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("", events)
        }
    }

    pub fn flaky(response_text: &str, failures: usize, events: EventLog) -> Self {
        let fetcher = Self::new(response_text, events);
        *fetcher.failures_before_success.lock().unwrap() = failures;
        fetcher
    }
}

impl TranscriptFetcher for MockTranscriptFetcher {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, TranscriptError> {
        self.calls.lock().unwrap().push(video_id.to_string());
        self.events.lock().unwrap().push(format!("fetch:{video_id}"));

        if let Some(ref msg) = self.fail_with {
            return Err(TranscriptError::Unavailable(msg.clone()));
        }

        let mut remaining = self.failures_before_success.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(TranscriptError::Unavailable("temporarily unavailable".into()));
        }

        Ok(Transcript::from(self.response_text.as_str()))
    }
}
