use std::sync::{Arc, Mutex};

use bridge_pulse::{
    auth::{Credential, CredentialProvider},
    docs::{DocsPublisher, DocumentEdit, DocumentStore},
    error::{AuthError, PublishError},
};

use super::EventLog;

#[derive(Clone)]
pub struct MockCredentialProvider {
    pub acquired: Arc<Mutex<usize>>,
    pub unavailable: bool,
}

impl MockCredentialProvider {
    pub fn new() -> Self {
        Self {
            acquired: Arc::new(Mutex::new(0)),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }
}

impl CredentialProvider for MockCredentialProvider {
    async fn acquire(&self) -> Result<Credential, AuthError> {
        *self.acquired.lock().unwrap() += 1;
        if self.unavailable {
            return Err(AuthError::InteractionUnavailable);
        }
        Ok(Credential {
            token: "mock-token".into(),
            refresh_token: Some("mock-refresh".into()),
            expiry: None,
            scopes: vec![],
        })
    }
}

#[derive(Clone)]
pub struct MockDocumentStore {
    pub events: EventLog,
    pub created: Arc<Mutex<Vec<String>>>,
    pub edits: Arc<Mutex<Vec<(String, Vec<DocumentEdit>)>>>,
    pub fail_create_with: Option<String>,
    pub fail_update_with: Option<String>,
}

impl MockDocumentStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            created: Arc::new(Mutex::new(Vec::new())),
            edits: Arc::new(Mutex::new(Vec::new())),
            fail_create_with: None,
            fail_update_with: None,
        }
    }

    pub fn failing_create(msg: &str, events: EventLog) -> Self {
        Self {
            fail_create_with: Some(msg.to_string()),
            ..Self::new(events)
        }
    }

    pub fn failing_update(msg: &str, events: EventLog) -> Self {
        Self {
            fail_update_with: Some(msg.to_string()),
            ..Self::new(events)
        }
    }
}

impl DocumentStore for MockDocumentStore {
    async fn create_document(&self, _credential: &Credential, title: &str) -> Result<String, PublishError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("create-document:{title}"));
        if let Some(ref msg) = self.fail_create_with {
            return Err(PublishError::Api {
                status: 503,
                message: msg.clone(),
            });
        }

        let mut created = self.created.lock().unwrap();
        created.push(title.to_string());
        Ok(format!("doc-{}", created.len()))
    }

    async fn batch_update(
        &self,
        _credential: &Credential,
        document_id: &str,
        edits: &[DocumentEdit],
    ) -> Result<(), PublishError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("batch-edit:{document_id}"));
        self.edits
            .lock()
            .unwrap()
            .push((document_id.to_string(), edits.to_vec()));
        if let Some(ref msg) = self.fail_update_with {
            return Err(PublishError::Api {
                status: 400,
                message: msg.clone(),
            });
        }
        Ok(())
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("https://docs.example.test/{document_id}/edit")
    }
}

pub type MockPublisher = DocsPublisher<MockCredentialProvider, MockDocumentStore>;

pub fn publisher(credentials: MockCredentialProvider, store: MockDocumentStore) -> MockPublisher {
    DocsPublisher::new(credentials, store)
}
