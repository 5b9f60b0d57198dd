use std::path::Path;

use crate::error::GenerationError;

pub const TRANSCRIPT_PLACEHOLDER: &str = "{{transcript}}";

/// Prompt text containing a `{{transcript}}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        PromptTemplate(template.into())
    }

    pub async fn load(path: &Path) -> Result<Self, GenerationError> {
        let template = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| GenerationError::Template {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(PromptTemplate(template))
    }

    /// Substitutes the transcript verbatim, without escaping.
    ///
    /// Placeholders that appear inside the transcript itself are left untouched.
    pub fn render(&self, transcript: &str) -> String {
        if !self.0.contains(TRANSCRIPT_PLACEHOLDER) {
            tracing::warn!(
                placeholder = TRANSCRIPT_PLACEHOLDER,
                "Prompt template has no transcript placeholder"
            );
        }
        self.0.replace(TRANSCRIPT_PLACEHOLDER, transcript)
    }
}
