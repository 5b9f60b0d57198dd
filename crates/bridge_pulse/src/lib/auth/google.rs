use std::{io::IsTerminal, path::Path, time::Duration};

use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};

use crate::auth::{AuthError, TokenExchange, TokenResponse};

/// Drive and Docs access
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/documents",
];

/// OAuth client registration as downloaded from the Google Cloud console
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".into()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file = serde_json::from_str::<ClientSecretsFile>(json)
            .map_err(|e| AuthError::MalformedSecrets(e.to_string()))?;

        file.installed.or(file.web).ok_or_else(|| {
            AuthError::MalformedSecrets("expected an 'installed' or 'web' client".into())
        })
    }

    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AuthError::ClientSecrets {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json(&json)
    }
}

/// Google installed-app OAuth flow with a loopback redirect
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    client: Client,
    secrets: ClientSecrets,
    scopes: Vec<String>,
    interactive_timeout: Duration,
}

impl GoogleOAuth {
    const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

    pub fn new(secrets: ClientSecrets) -> Self {
        Self {
            client: Client::new(),
            secrets,
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            interactive_timeout: Self::INTERACTIVE_TIMEOUT,
        }
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url, AuthError> {
        let scope = self.scopes.join(" ");

        Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::MalformedSecrets(format!("invalid auth_uri: {e}")))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.secrets.token_uri)
            .form(form)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to reach token endpoint"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Endpoint { status, message });
        }

        Ok(resp.json::<TokenResponse>().await?)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse, AuthError> {
        self.request_token(&[
            ("code", code),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }
}

impl TokenExchange for GoogleOAuth {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.request_token(&[
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn authorize(&self) -> Result<TokenResponse, AuthError> {
        if !std::io::stdin().is_terminal() {
            return Err(AuthError::InteractionUnavailable);
        }

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::Interactive(format!("failed to bind redirect listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Interactive(e.to_string()))?
            .port();

        let redirect_uri = format!("http://127.0.0.1:{port}/");
        let state = new_state();
        let url = self.authorization_url(&redirect_uri, &state)?;

        eprintln!("Open the following URL in a browser to authorize document access:\n\n{url}\n");
        tracing::info!(%redirect_uri, "Waiting for authorization redirect");

        let code = tokio::time::timeout(self.interactive_timeout, wait_for_code(&listener, &state))
            .await
            .map_err(|_| AuthError::Interactive("timed out waiting for authorization".into()))??;

        self.exchange_code(&code, &redirect_uri).await
    }
}

/// Accepts redirect requests until one carries the authorization code
async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    let io_error = |e: std::io::Error| AuthError::Interactive(e.to_string());

    loop {
        let (mut socket, _) = listener.accept().await.map_err(io_error)?;
        let (read_half, mut write_half) = socket.split();

        let mut request_line = String::new();
        BufReader::new(read_half)
            .read_line(&mut request_line)
            .await
            .map_err(io_error)?;

        let Some(target) = request_line.split_whitespace().nth(1) else {
            continue;
        };

        let (outcome, status, body) = match parse_redirect(target, expected_state) {
            Ok(Some(code)) => (
                Some(Ok(code)),
                "200 OK",
                "Authorization complete. You may close this window.",
            ),
            // browsers also ask for /favicon.ico and the like
            Ok(None) => (None, "404 Not Found", "Not found."),
            Err(e) => (Some(Err(e)), "400 Bad Request", "Authorization failed."),
        };

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        if let Err(e) = write_half.write_all(response.as_bytes()).await {
            tracing::debug!(error = %e, "Failed to answer redirect request");
        }

        if let Some(outcome) = outcome {
            return outcome;
        }
    }
}

/// Reads the authorization code out of a redirect request target.
///
/// Returns `Ok(None)` for requests that carry neither a code nor an error.
fn parse_redirect(target: &str, expected_state: &str) -> Result<Option<String>, AuthError> {
    let url = Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(target))
        .map_err(|e| AuthError::Interactive(format!("malformed redirect: {e}")))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(AuthError::Interactive(format!(
                    "authorization denied: {value}"
                )))
            }
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(code) = code else {
        return Ok(None);
    };

    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::Interactive(
            "redirect state does not match the authorization request".into(),
        ));
    }

    Ok(Some(code))
}

fn new_state() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{nanos:x}{:x}", std::process::id())
}
