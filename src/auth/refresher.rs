//! Token refresh operations

use super::types::Credential;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;

/// Operation that obtains a new credential
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Fetch a new credential, given the current one if any
    async fn refresh(&self, current: Option<&Credential>) -> Result<Credential>;
}

// ============================================================================
// Closure Refresher
// ============================================================================

/// Refresher backed by an async closure
pub struct FnRefresher<F> {
    refresh: F,
}

/// Wrap an async closure as a `TokenRefresher`
pub fn refresh_fn<F, Fut>(refresh: F) -> FnRefresher<F>
where
    F: Fn(Option<Credential>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Credential>> + Send + 'static,
{
    FnRefresher { refresh }
}

#[async_trait]
impl<F, Fut> TokenRefresher for FnRefresher<F>
where
    F: Fn(Option<Credential>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Credential>> + Send + 'static,
{
    async fn refresh(&self, current: Option<&Credential>) -> Result<Credential> {
        (self.refresh)(current.cloned()).await
    }
}

impl<F> std::fmt::Debug for FnRefresher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRefresher").finish_non_exhaustive()
    }
}

// ============================================================================
// OAuth2 Refresh Token Flow
// ============================================================================

/// OAuth2 `refresh_token` grant against a token endpoint
#[derive(Clone)]
pub struct OAuth2Refresher {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    /// Used when the current credential carries no refresh token
    refresh_token: Option<String>,
    scopes: Vec<String>,
}

impl OAuth2Refresher {
    /// Create a refresher for a public client
    pub fn new(token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            refresh_token: None,
            scopes: Vec::new(),
        }
    }

    /// Set the client secret
    #[must_use]
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Set the refresh token used until the server issues a new one
    #[must_use]
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Request scopes
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Use a custom HTTP client for token requests
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }
}

impl std::fmt::Debug for OAuth2Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Refresher")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenRefresher for OAuth2Refresher {
    async fn refresh(&self, current: Option<&Credential>) -> Result<Credential> {
        let refresh_token = current
            .and_then(|c| c.refresh_token.clone())
            .or_else(|| self.refresh_token.clone())
            .ok_or_else(|| Error::authentication("No refresh token available"))?;

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.client_id.clone()),
            ("refresh_token", refresh_token.clone()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        if !self.scopes.is_empty() {
            form.push(("scope", self.scopes.join(" ")));
        }

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::authentication(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::authentication(format!(
                "Refresh token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::authentication(format!("Invalid token response: {e}")))?;
        Ok(token_response.into_credential(refresh_token))
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// Keep the previous refresh token when the server does not rotate it
    fn into_credential(self, previous_refresh_token: String) -> Credential {
        let credential = match self.expires_in {
            Some(secs) => Credential::expires_in(self.access_token, secs),
            None => Credential::new(self.access_token),
        };
        credential.with_refresh_token(self.refresh_token.unwrap_or(previous_refresh_token))
    }
}
