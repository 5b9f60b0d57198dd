use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::Credential,
    docs::{DocumentEdit, DocumentStore},
    error::PublishError,
};

#[derive(Debug, Clone)]
pub struct GoogleDocsClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
}

impl Default for GoogleDocsClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://docs.googleapis.com/v1".into(),
        }
    }
}

impl GoogleDocsClient {
    const DOCUMENT_BASE_URL: &str = "https://docs.google.com/document/d";

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, PublishError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(PublishError::Api { status, message });
        }
        Ok(resp)
    }
}

impl DocumentStore for GoogleDocsClient {
    async fn create_document(&self, credential: &Credential, title: &str) -> Result<String, PublishError> {
        let resp = self
            .client
            .post(format!("{}/documents", self.base_url))
            .bearer_auth(&credential.token)
            .json(&json!({ "title": title }))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let created = Self::check(resp).await?.json::<CreatedDocument>().await?;
        tracing::debug!(document_id = %created.document_id, "Created document");

        Ok(created.document_id)
    }

    async fn batch_update(
        &self,
        credential: &Credential,
        document_id: &str,
        edits: &[DocumentEdit],
    ) -> Result<(), PublishError> {
        let requests = edits.iter().map(DocumentEdit::to_request).collect::<Vec<_>>();

        let resp = self
            .client
            .post(format!("{}/documents/{document_id}:batchUpdate", self.base_url))
            .bearer_auth(&credential.token)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        Self::check(resp).await?;
        Ok(())
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/{document_id}/edit", Self::DOCUMENT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url() {
        let client = GoogleDocsClient::default();
        assert_eq!(
            client.document_url("1AbCdEf"),
            "https://docs.google.com/document/d/1AbCdEf/edit"
        );
    }
}
