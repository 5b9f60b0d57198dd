use chrono::Utc;

use crate::auth::{
    store::CredentialStore, AuthError, Credential, CredentialProvider, TokenExchange,
};

/// Credential provider backed by a persisted token and an OAuth authorization server.
///
/// Resolution order on every [`acquire`](CredentialProvider::acquire):
/// 1. a still-valid persisted credential is returned as is;
/// 2. otherwise its refresh token, if any, is exchanged for a new access token;
/// 3. otherwise (or if refreshing fails) the interactive flow runs.
///
/// Any newly obtained credential is persisted before it is returned. There is a
/// single writer per process, so refreshes are not serialized.
#[derive(Debug, Clone)]
pub struct OAuthCredentialProvider<X: TokenExchange> {
    store: CredentialStore,
    exchange: X,
}

impl<X: TokenExchange> OAuthCredentialProvider<X> {
    pub fn new(store: CredentialStore, exchange: X) -> Self {
        Self { store, exchange }
    }

    async fn try_refresh(&self, stored: Option<&Credential>) -> Option<Credential> {
        let refresh_token = stored?.refresh_token.clone()?;

        match self.exchange.refresh(&refresh_token).await {
            Ok(response) => {
                tracing::info!("Refreshed document store credential");
                Some(response.into_credential(Some(refresh_token), Utc::now()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Credential refresh failed, falling back to authorization");
                None
            }
        }
    }
}

impl<X: TokenExchange> CredentialProvider for OAuthCredentialProvider<X> {
    #[tracing::instrument(skip(self), fields(path = ?self.store.path()))]
    async fn acquire(&self) -> Result<Credential, AuthError> {
        let stored = self.store.load().await?;

        if let Some(credential) = stored.as_ref().filter(|c| c.is_valid()) {
            return Ok(credential.clone());
        }

        let credential = match self.try_refresh(stored.as_ref()).await {
            Some(credential) => credential,
            None => {
                tracing::info!("Starting interactive authorization");
                self.exchange
                    .authorize()
                    .await
                    .inspect_err(|e| tracing::error!(error = %e, "Authorization failed"))?
                    .into_credential(None, Utc::now())
            }
        };

        self.store.save(&credential).await?;
        Ok(credential)
    }
}
