use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::auth::{AuthError, Credential};

/// JSON file holding the persisted credential
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, source: std::io::Error) -> AuthError {
        AuthError::Storage {
            path: self.path.clone(),
            source,
        }
    }

    /// Returns `None` when nothing usable is stored. A corrupt file is
    /// treated as absent so the caller can re-authorize.
    pub async fn load(&self) -> Result<Option<Credential>, AuthError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_error(e)),
        };

        match serde_json::from_slice::<Credential>(&bytes) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                tracing::warn!(error = %e, path = ?self.path, "Discarding unreadable credential file");
                Ok(None)
            }
        }
    }

    /// Writes through a temporary file so a crash never leaves a truncated credential
    pub async fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec_pretty(credential)
            .map_err(|e| self.storage_error(std::io::Error::other(e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_error(e))?;
        }

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| self.storage_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.storage_error(e))?;
        }

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.storage_error(e))?;

        tracing::debug!(path = ?self.path, "Persisted credential");
        Ok(())
    }
}
