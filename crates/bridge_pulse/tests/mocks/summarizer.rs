use std::sync::{Arc, Mutex};

use bridge_pulse::{Summarizer, SummaryResponse};

use super::EventLog;

#[derive(Clone)]
pub struct MockSummarizer {
    pub summary: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub events: EventLog,
    pub fail_with: Option<String>,
    /// 1-based call number that panics instead of answering
    pub panic_on_call: Option<usize>,
}

impl MockSummarizer {
    pub fn new(summary: &str, events: EventLog) -> Self {
        Self {
            summary: summary.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            events,
            fail_with: None,
            panic_on_call: None,
        }
    }

    pub fn failing(msg: &str, events: EventLog) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("", events)
        }
    }

    pub fn panicking_on_call(call: usize, summary: &str, events: EventLog) -> Self {
        Self {
            panic_on_call: Some(call),
            ..Self::new(summary, events)
        }
    }
}

impl Summarizer for MockSummarizer {
    const CONTEXT_WINDOW_LIMIT: usize = 128_000;
    const SUMMARIZER_MODEL: &'static str = "mock-gpt";
    type Error = anyhow::Error;

    async fn summarize(&self, prompt: &str) -> Result<SummaryResponse, Self::Error> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(prompt.to_string());
            calls.len()
        };
        self.events.lock().unwrap().push("summarize".to_string());
        if self.panic_on_call == Some(call) {
            panic!("summarizer blew up on call {call}");
        }
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(SummaryResponse {
            summary: self.summary.clone(),
        })
    }
}
