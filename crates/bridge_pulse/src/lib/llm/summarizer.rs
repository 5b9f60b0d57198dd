use std::{fmt::Display, future::Future};

use serde::Deserialize;

pub trait Summarizer {
    /// Rough prompt budget in tokens, leaving room for the completion
    const CONTEXT_WINDOW_LIMIT: usize = 128_000 - 18_000;
    const SUMMARIZER_MODEL: &'static str;

    type Error: Display;

    /// Sends a fully rendered prompt to the text-generation backend
    fn summarize(&self, prompt: &str) -> impl Future<Output = Result<SummaryResponse, Self::Error>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}
