use reqwest::Client;
use serde::Deserialize;

use crate::{Summarizer, SummaryResponse};

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No content in completion response")]
    EmptyCompletion,
}

impl OpenAIClient {
    const SYSTEM_PROMPT: &str = include_str!("./prompts/system_0.txt");
    const DEFAULT_MAX_TOKENS: u32 = 500;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: <Self as Summarizer>::SUMMARIZER_MODEL.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ceiling on the length of generated summaries
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn send_completion_request(
        &self,
        model_name: &str,
        user_content: impl Into<String>,
        max_tokens: u32,
    ) -> Result<CompletionResponse, OpenAIError> {
        let body = serde_json::json!({
            "model": model_name,
            "messages": [
                {
                    "role": "system",
                    "content": Self::SYSTEM_PROMPT.trim()
                },
                {
                    "role": "user",
                    "content": user_content.into()
                }
            ],
            "max_tokens": max_tokens
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Trimmed content of the first choice, if any
    pub fn first_content(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(str::to_string)
    }
}

impl Summarizer for OpenAIClient {
    const SUMMARIZER_MODEL: &'static str = "gpt-4o";
    type Error = OpenAIError;

    async fn summarize(&self, prompt: &str) -> Result<SummaryResponse, Self::Error> {
        let response = self
            .send_completion_request(&self.model, prompt, self.max_tokens)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to summarize content"))?;

        if let Some(reason) = response.choices.first().and_then(|c| c.finish_reason.as_deref()) {
            if reason == "length" {
                tracing::warn!(max_tokens = self.max_tokens, "Summary was cut off at the token ceiling");
            }
        }

        let summary = response.first_content().ok_or(OpenAIError::EmptyCompletion)?;

        Ok(SummaryResponse { summary })
    }
}
