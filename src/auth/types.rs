//! Credential types

use chrono::{DateTime, Utc};

/// Seconds before expiry at which a credential already counts as expired
const EXPIRY_BUFFER_SECONDS: i64 = 30;

/// Access credential with optional refresh token and expiry
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The access token sent as a bearer token
    pub access_token: String,
    /// Token used to obtain a new access token
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create a credential that never expires
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Create a credential that expires in N seconds from now
    pub fn expires_in(access_token: impl Into<String>, seconds: i64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    /// Attach a refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(EXPIRY_BUFFER_SECONDS);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Which credential, if any, was attached to a request
///
/// Returned by `AuthProvider::decorate` and handed back on rejection so the
/// provider can tell a stale rejection from a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStamp {
    /// Nothing was attached
    Anonymous,
    /// The credential of `generation` was attached after `epoch` refresh
    /// attempts had completed
    Credential { generation: u64, epoch: u64 },
}
