pub mod google;

use std::future::Future;

use serde_json::{json, Value};

use crate::{
    auth::{Credential, CredentialProvider},
    error::PublishError,
};

/// A document created by the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDocument {
    pub id: String,
    pub url: String,
}

/// A single edit applied as part of a batch update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEdit {
    InsertText { index: u32, text: String },
}

impl DocumentEdit {
    pub fn to_request(&self) -> Value {
        match self {
            DocumentEdit::InsertText { index, text } => json!({
                "insertText": {
                    "location": { "index": index },
                    "text": text
                }
            }),
        }
    }
}

/// Low level document-store API
pub trait DocumentStore {
    fn create_document(
        &self,
        credential: &Credential,
        title: &str,
    ) -> impl Future<Output = Result<String, PublishError>>;

    fn batch_update(
        &self,
        credential: &Credential,
        document_id: &str,
        edits: &[DocumentEdit],
    ) -> impl Future<Output = Result<(), PublishError>>;

    fn document_url(&self, document_id: &str) -> String;
}

pub trait Publisher {
    fn publish(
        &self,
        title: &str,
        summary: &str,
    ) -> impl Future<Output = Result<PublishedDocument, PublishError>>;
}

/// Publishes summaries as new documents, authenticating every call through `P`
#[derive(Debug, Clone)]
pub struct DocsPublisher<P, S> {
    credentials: P,
    store: S,
}

impl<P, S> DocsPublisher<P, S>
where
    P: CredentialProvider,
    S: DocumentStore,
{
    /// Body documents start at index 1
    const START_INDEX: u32 = 1;

    pub fn new(credentials: P, store: S) -> Self {
        Self { credentials, store }
    }

    pub fn render_body(summary: &str) -> String {
        format!("### Summary ###\n{summary}")
    }
}

impl<P, S> Publisher for DocsPublisher<P, S>
where
    P: CredentialProvider,
    S: DocumentStore,
{
    #[tracing::instrument(skip(self, summary))]
    async fn publish(&self, title: &str, summary: &str) -> Result<PublishedDocument, PublishError> {
        let credential = self.credentials.acquire().await?;

        let document_id = self
            .store
            .create_document(&credential, title)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create document"))?;

        let edits = [DocumentEdit::InsertText {
            index: Self::START_INDEX,
            text: Self::render_body(summary),
        }];

        // the empty document is left in place; nothing cleans it up
        self.store
            .batch_update(&credential, &document_id, &edits)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    error = %e,
                    document_id = %document_id,
                    "Failed to write summary, document left empty"
                )
            })?;

        Ok(PublishedDocument {
            url: self.store.document_url(&document_id),
            id: document_id,
        })
    }
}
