//! Client and its configuration
//!
//! A [`Client`] owns the shared configuration, the transport and the auth
//! provider. Each [`Client::send`] runs independently; clones share state.

use super::dispatcher::Dispatcher;
use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use crate::request::RequestDescriptor;
use crate::retry::{RetryPolicy, StatusRule};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{BackoffType, LogLevel, StringPairs};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Configuration shared by every call of a client
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL that relative paths are joined onto
    pub base_url: Option<String>,
    /// Per-transmission timeout
    pub timeout: Duration,
    /// Upper bound on one call including retries and backoff
    pub total_timeout: Option<Duration>,
    /// Headers sent with every request, overridable per request
    pub default_headers: StringPairs,
    /// Credential provider for requests that require auth
    pub auth: Option<Arc<dyn AuthProvider>>,
    pub retry: RetryPolicy,
    /// Which dispatcher events are emitted
    pub log_level: LogLevel,
    /// Refuse descriptors with issues instead of warning about them
    pub strict: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            total_timeout: None,
            default_headers: Vec::new(),
            auth: None,
            retry: RetryPolicy::default(),
            log_level: LogLevel::default(),
            strict: false,
            user_agent: format!("courier/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("total_timeout", &self.total_timeout)
            .field("default_headers", &self.default_headers)
            .field("auth", &self.auth.is_some())
            .field("retry", &self.retry)
            .field("log_level", &self.log_level)
            .field("strict", &self.strict)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Builder for client config
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the per-transmission timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Bound the whole call, retries included
    #[must_use]
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.config.total_timeout = Some(timeout);
        self
    }

    /// Add a default header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((key.into(), value.into()));
        self
    }

    /// Set max retries
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retry_count = retries;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.retry = self.config.retry.with_backoff(backoff_type, initial, max);
        self
    }

    /// Set which HTTP statuses are retried
    #[must_use]
    pub fn retry_on(mut self, rules: Vec<StatusRule>) -> Self {
        self.config.retry = self.config.retry.with_statuses(rules);
        self
    }

    /// Replace the whole retry policy
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Set the auth provider
    #[must_use]
    pub fn auth(self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_arc(Arc::new(provider))
    }

    /// Set a shared auth provider
    #[must_use]
    pub fn auth_arc(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.config.auth = Some(provider);
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Set user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Validated state shared by clones of a client
pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) base_url: Option<Url>,
    pub(crate) default_headers: HeaderMap,
    pub(crate) transport: Arc<dyn Transport>,
}

impl ClientInner {
    fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let base_url = config.base_url.as_deref().map(Url::parse).transpose()?;
        if let Some(url) = &base_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "Base URL must use http or https: {url}"
                )));
            }
        }

        let mut default_headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| Error::config(format!("Invalid user agent: {}", config.user_agent)))?;
        default_headers.insert(USER_AGENT, agent);
        for (key, value) in &config.default_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| Error::config(format!("Invalid header name: {key}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::config(format!("Invalid value for header {key}")))?;
            default_headers.insert(name, value);
        }

        Ok(Self {
            config,
            base_url,
            default_headers,
            transport,
        })
    }
}

/// HTTP client dispatching typed request descriptors
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client using the default reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()?))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(ClientInner::new(config, transport)?),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Execute a request, retrying and refreshing credentials as configured
    ///
    /// Dropping the returned future abandons the call.
    pub async fn send<T>(&self, request: &RequestDescriptor<T>) -> Result<T> {
        self.send_with_cancel(request, CancellationToken::new()).await
    }

    /// Execute a request that ends with `Error::Cancelled` once `cancel` fires
    pub async fn send_with_cancel<T>(
        &self,
        request: &RequestDescriptor<T>,
        cancel: CancellationToken,
    ) -> Result<T> {
        Dispatcher::new(&self.inner, cancel).dispatch(request).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
