//! Wire-level request and response types

use crate::error::Result;
use crate::types::Method;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use url::Url;

/// A fully built request, ready to transmit
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL including query string
    pub url: Url,
    /// Merged headers
    pub headers: HeaderMap,
    /// Encoded body
    pub body: Option<Bytes>,
    /// Whether credentials should be attached
    pub requires_auth: bool,
}

/// Raw transport response prior to typed decoding
#[derive(Debug, Clone, Default)]
pub struct ResponseEnvelope {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body bytes
    pub body: Bytes,
}

impl ResponseEnvelope {
    /// Create an envelope with no headers
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Retry-After` header value, in delay-seconds form
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// HTTP transport capability
///
/// Implementations map network failures to `Error::Transport` and return
/// every HTTP response, whatever its status, as a `ResponseEnvelope`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for the full response
    async fn transmit(&self, request: WireRequest, timeout: Duration) -> Result<ResponseEnvelope>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_envelope_is_success() {
        assert!(ResponseEnvelope::new(200, "").is_success());
        assert!(ResponseEnvelope::new(204, "").is_success());
        assert!(!ResponseEnvelope::new(301, "").is_success());
        assert!(!ResponseEnvelope::new(503, "").is_success());
    }

    #[test]
    fn test_envelope_retry_after() {
        let mut envelope = ResponseEnvelope::new(503, "");
        assert_eq!(envelope.retry_after(), None);

        envelope
            .headers
            .insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(envelope.retry_after(), Some(Duration::from_secs(2)));

        envelope.headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(envelope.retry_after(), None);
    }
}
