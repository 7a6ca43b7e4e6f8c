//! Declarative client settings
//!
//! `ClientSettings` is the YAML form of a client configuration. It covers
//! everything a [`ClientConfig`] holds except custom transports and
//! closure-based refreshers, which are added to the returned builder.

use crate::auth::{OAuth2Refresher, RefreshableBearer, StaticBearer};
use crate::error::{Error, Result};
use crate::http::{ClientConfig, ClientConfigBuilder};
use crate::retry::StatusRule;
use crate::types::{BackoffType, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Client Settings
// ============================================================================

/// Client configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL for relative request paths
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-transmission timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bound on a whole call, retries included
    #[serde(default)]
    pub total_timeout_seconds: Option<u64>,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP statuses to retry on ("5xx", "429", ...)
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<StatusRule>,

    /// Retry backoff configuration
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Refuse descriptors with issues
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout(),
            total_timeout_seconds: None,
            headers: BTreeMap::new(),
            max_retries: default_max_retries(),
            retry_statuses: default_retry_statuses(),
            backoff: BackoffConfig::default(),
            auth: AuthSettings::default(),
            log_level: LogLevel::default(),
            strict: false,
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_statuses() -> Vec<StatusRule> {
    vec![StatusRule::SERVER_ERRORS]
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

// ============================================================================
// Auth Settings
// ============================================================================

/// Authentication configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSettings {
    /// No credentials
    #[default]
    None,

    /// Fixed bearer token
    Bearer { token: String },

    /// OAuth2 refresh token flow, refreshed on rejection or expiry
    #[serde(rename = "oauth2_refresh")]
    OAuth2Refresh {
        token_url: String,
        client_id: String,
        #[serde(default)]
        client_secret: Option<String>,
        refresh_token: String,
        #[serde(default)]
        scopes: Vec<String>,
    },
}

// ============================================================================
// Loading
// ============================================================================

impl ClientSettings {
    /// Parse settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Check values that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(Error::config("timeout_seconds must be greater than zero"));
        }
        if self.total_timeout_seconds == Some(0) {
            return Err(Error::config(
                "total_timeout_seconds must be greater than zero",
            ));
        }
        if self.backoff.initial_ms > self.backoff.max_ms {
            return Err(Error::config(format!(
                "Backoff initial_ms ({}) exceeds max_ms ({})",
                self.backoff.initial_ms, self.backoff.max_ms
            )));
        }
        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url)?;
        }
        Ok(())
    }

    /// Turn the settings into a config builder
    ///
    /// Anything the settings cannot express, such as a closure refresher,
    /// can still be set on the returned builder.
    pub fn into_builder(self) -> ClientConfigBuilder {
        let mut builder = ClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .retry_on(self.retry_statuses)
            .backoff(
                self.backoff.backoff_type,
                Duration::from_millis(self.backoff.initial_ms),
                Duration::from_millis(self.backoff.max_ms),
            )
            .log_level(self.log_level)
            .strict(self.strict);

        if let Some(base_url) = self.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(seconds) = self.total_timeout_seconds {
            builder = builder.total_timeout(Duration::from_secs(seconds));
        }
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }

        match self.auth {
            AuthSettings::None => builder,
            AuthSettings::Bearer { token } => builder.auth(StaticBearer::new(token)),
            AuthSettings::OAuth2Refresh {
                token_url,
                client_id,
                client_secret,
                refresh_token,
                scopes,
            } => {
                let mut refresher = OAuth2Refresher::new(token_url, client_id)
                    .refresh_token(refresh_token)
                    .scopes(scopes);
                if let Some(secret) = client_secret {
                    refresher = refresher.client_secret(secret);
                }
                builder.auth(RefreshableBearer::new(refresher))
            }
        }
    }

    /// Build the config directly
    pub fn into_config(self) -> ClientConfig {
        self.into_builder().build()
    }
}
