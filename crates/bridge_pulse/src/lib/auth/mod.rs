pub mod google;
pub mod provider;
pub mod store;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::error::AuthError;

/// OAuth access credential for the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Tokens this close to expiry are treated as expired
    const EXPIRY_SKEW_SECS: i64 = 60;

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry <= now + chrono::Duration::seconds(Self::EXPIRY_SKEW_SECS))
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

pub trait CredentialProvider {
    fn acquire(&self) -> impl Future<Output = Result<Credential, AuthError>>;
}

/// Successful reply from an OAuth token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Refresh responses usually omit the refresh token; `previous_refresh_token` is kept then.
    pub fn into_credential(
        self,
        previous_refresh_token: Option<String>,
        issued_at: DateTime<Utc>,
    ) -> Credential {
        Credential {
            token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expiry: self
                .expires_in
                .map(|secs| issued_at + chrono::Duration::seconds(secs)),
            scopes: self
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// The two ways of obtaining a fresh token from the authorization server
pub trait TokenExchange {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenResponse, AuthError>>;

    /// Runs the user-facing authorization flow
    fn authorize(&self) -> impl Future<Output = Result<TokenResponse, AuthError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expiry: Option<DateTime<Utc>>) -> Credential {
        Credential {
            token: "ya29.token".into(),
            refresh_token: Some("1//refresh".into()),
            expiry,
            scopes: vec![],
        }
    }

    #[test]
    fn test_credential_validity_respects_skew() {
        let now = Utc::now();

        assert!(credential(Some(now + chrono::Duration::minutes(10))).is_valid_at(now));
        assert!(!credential(Some(now + chrono::Duration::seconds(30))).is_valid_at(now));
        assert!(!credential(Some(now - chrono::Duration::minutes(1))).is_valid_at(now));
        assert!(credential(None).is_valid_at(now), "No expiry means not expired");
    }

    #[test]
    fn test_empty_token_is_invalid() {
        let mut cred = credential(None);
        cred.token.clear();
        assert!(!cred.is_valid());
    }

    #[test]
    fn test_token_response_keeps_previous_refresh_token() {
        let issued_at = Utc::now();
        let response = TokenResponse {
            access_token: "new-token".into(),
            expires_in: Some(3599),
            refresh_token: None,
            scope: Some("https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/documents".into()),
        };

        let cred = response.into_credential(Some("old-refresh".into()), issued_at);

        assert_eq!(cred.token, "new-token");
        assert_eq!(cred.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(cred.expiry, Some(issued_at + chrono::Duration::seconds(3599)));
        assert_eq!(cred.scopes.len(), 2);
    }
}
