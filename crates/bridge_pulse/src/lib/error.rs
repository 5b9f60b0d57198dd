use std::path::PathBuf;

use bridge_datastore::WriteBackError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Interactive authorization required but no terminal is attached")]
    InteractionUnavailable,
    #[error("Interactive authorization failed: {0}")]
    Interactive(String),
    #[error("Failed to read client secrets {path}: {source}")]
    ClientSecrets {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed client secrets: {0}")]
    MalformedSecrets(String),
    #[error("Credential storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Token endpoint error: {status} - {message}")]
    Endpoint { status: u16, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Malformed recording locator: {0}")]
    MalformedLocator(String),
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Transcript unavailable: {0}")]
    Unavailable(String),
    #[error("Parse error: {0}")]
    ParseError(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Failed to load prompt template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Text generation failed: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Document store error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Closed set of failure kinds a pipeline stage can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    TransientFetch,
    Generation,
    Publish,
    WriteBack,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Transcript fetch failed: {0}")]
    TransientFetch(#[from] TranscriptError),
    #[error("Summary generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("Publishing failed: {0}")]
    Publish(PublishError),
    #[error("Write-back failed: {0}")]
    WriteBack(#[from] WriteBackError),
}

impl From<PublishError> for Error {
    fn from(value: PublishError) -> Self {
        match value {
            PublishError::Auth(e) => Error::Auth(e),
            other => Error::Publish(other),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(_) => ErrorKind::Auth,
            Error::TransientFetch(_) => ErrorKind::TransientFetch,
            Error::Generation(_) => ErrorKind::Generation,
            Error::Publish(_) => ErrorKind::Publish,
            Error::WriteBack(_) => ErrorKind::WriteBack,
        }
    }

    /// Only authorization failures stop the process; everything else skips the item
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}
