//! Transport backed by reqwest

use super::types::{ResponseEnvelope, Transport, WireRequest};
use crate::error::{Error, Result, TransportErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::trace;

/// Default transport using a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh connection pool
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a transport around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn transmit(&self, request: WireRequest, timeout: Duration) -> Result<ResponseEnvelope> {
        trace!("Transmitting {} {}", request.method, request.url);

        let mut req = self
            .client
            .request(request.method.into(), request.url)
            .headers(request.headers)
            .timeout(timeout);

        if let Some(body) = request.body {
            req = req.body(body);
        }

        let response = req.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?;

        Ok(ResponseEnvelope {
            status,
            headers,
            body,
        })
    }
}

/// Map a reqwest failure onto the transport error kinds
fn classify(e: reqwest::Error) -> Error {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    Error::transport(kind, e.to_string())
}
