//! Dispatcher
//!
//! Runs one logical call through
//! `Building → Authorizing → Sending → (Success | Retrying | RefreshingAuth | Failed | Cancelled)`.
//! Every suspension point races the call's cancellation token.

use super::client::ClientInner;
use crate::auth::AuthStamp;
use crate::decode::ResponseDecoder;
use crate::encode::encode;
use crate::error::{Error, Result, TransportErrorKind};
use crate::request::RequestDescriptor;
use crate::retry::RetryDecision;
use crate::transport::{ResponseEnvelope, WireRequest};
use crate::types::LogLevel;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Status the server uses to reject credentials
const UNAUTHORIZED: u16 = 401;

/// States of one logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchState {
    Building,
    Authorizing,
    Sending,
    Retrying,
    RefreshingAuth,
    Success,
    Failed,
    Cancelled,
}

/// Bookkeeping across the tries of one call
#[derive(Debug)]
pub(crate) struct Attempt {
    /// Retry-budget attempt number, starting at 1
    pub number: u32,
    /// Transmissions performed, including the auth retry
    pub transmissions: u32,
    pub started: Instant,
    pub deadline: Option<Instant>,
}

impl Attempt {
    fn new(total_timeout: Option<Duration>) -> Self {
        let started = Instant::now();
        Self {
            number: 1,
            transmissions: 0,
            started,
            deadline: total_timeout.map(|t| started + t),
        }
    }

    /// Whether waiting `delay` still leaves time before the deadline
    fn allows(&self, delay: Duration) -> bool {
        self.deadline.map_or(true, |deadline| Instant::now() + delay < deadline)
    }

    /// Timeout for the next transmission, clamped to the deadline
    ///
    /// `None` once the deadline has passed.
    fn transmit_timeout(&self, timeout: Duration) -> Option<Duration> {
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(timeout.min(remaining))
                }
            }
            None => Some(timeout),
        }
    }
}

/// Executes one call on behalf of a client
pub(crate) struct Dispatcher<'a> {
    client: &'a ClientInner,
    cancel: CancellationToken,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(client: &'a ClientInner, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    pub(crate) async fn dispatch<T>(&self, request: &RequestDescriptor<T>) -> Result<T> {
        let label = format!("{} {}", request.method(), request.path());
        if self.cancel.is_cancelled() {
            self.enter(&label, DispatchState::Cancelled);
            return Err(Error::Cancelled);
        }

        self.enter(&label, DispatchState::Building);
        let prepared = self.build(request, &label)?;
        let timeout = request
            .timeout_override()
            .unwrap_or(self.client.config.timeout);
        let auth = self
            .client
            .config
            .auth
            .as_deref()
            .filter(|_| prepared.requires_auth);

        let mut attempt = Attempt::new(self.client.config.total_timeout);
        let mut auth_retried = false;

        loop {
            let mut wire = prepared.clone();
            let stamp = match auth {
                Some(provider) => {
                    self.enter(&label, DispatchState::Authorizing);
                    match self
                        .cancellable(&label, provider.decorate(&mut wire))
                        .await
                    {
                        Ok(stamp) => stamp,
                        Err(e) => {
                            if !e.is_cancelled() {
                                self.enter(&label, DispatchState::Failed);
                                self.log(LogLevel::Warn, format_args!("{label}: {e}"));
                            }
                            return Err(e);
                        }
                    }
                }
                None => AuthStamp::Anonymous,
            };

            let Some(budget) = attempt.transmit_timeout(timeout) else {
                let error = Error::transport(
                    TransportErrorKind::Timeout,
                    format!(
                        "Total timeout elapsed after {:?}",
                        attempt.started.elapsed()
                    ),
                );
                self.enter(&label, DispatchState::Failed);
                self.log(LogLevel::Warn, format_args!("{label}: {error}"));
                return Err(error);
            };

            self.enter(&label, DispatchState::Sending);
            attempt.transmissions += 1;
            self.log(
                LogLevel::Debug,
                format_args!(
                    "{label}: transmission {} (attempt {}/{})",
                    attempt.transmissions,
                    attempt.number,
                    self.client.config.retry.max_retry_count + 1
                ),
            );
            let outcome = self
                .cancellable(&label, self.transmit(wire, budget))
                .await;

            let error = match outcome {
                Ok(envelope) if envelope.is_success() => {
                    return match request.decoder().decode(&envelope) {
                        Ok(value) => {
                            self.enter(&label, DispatchState::Success);
                            self.log(
                                LogLevel::Debug,
                                format_args!(
                                    "{label}: {} after {} transmission(s) in {:?}",
                                    envelope.status,
                                    attempt.transmissions,
                                    attempt.started.elapsed()
                                ),
                            );
                            Ok(value)
                        }
                        Err(e) => {
                            self.enter(&label, DispatchState::Failed);
                            self.log(LogLevel::Warn, format_args!("{label}: {e}"));
                            Err(e)
                        }
                    };
                }
                Ok(envelope) if envelope.status == UNAUTHORIZED => match auth {
                    Some(provider) => {
                        if auth_retried {
                            self.enter(&label, DispatchState::Failed);
                            return Err(Error::authentication(
                                "Credential rejected again after refresh",
                            ));
                        }
                        self.enter(&label, DispatchState::RefreshingAuth);
                        if let Err(e) = self
                            .cancellable(&label, provider.handle_rejection(&stamp))
                            .await
                        {
                            if !e.is_cancelled() {
                                self.enter(&label, DispatchState::Failed);
                                self.log(LogLevel::Warn, format_args!("{label}: {e}"));
                            }
                            return Err(e);
                        }
                        auth_retried = true;
                        continue;
                    }
                    None => Error::http_status(envelope.status, envelope.body),
                },
                Ok(envelope) => Error::HttpStatus {
                    status: envelope.status,
                    retry_after: envelope.retry_after(),
                    body: envelope.body,
                },
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => e,
            };

            match self.client.config.retry.should_retry(attempt.number, &error) {
                RetryDecision::Retry(delay) if attempt.allows(delay) => {
                    self.enter(&label, DispatchState::Retrying);
                    self.log(
                        LogLevel::Warn,
                        format_args!(
                            "{label}: {error}, attempt {}/{}, retrying in {delay:?}",
                            attempt.number,
                            self.client.config.retry.max_retry_count + 1
                        ),
                    );
                    self.cancellable(&label, async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await?;
                    attempt.number += 1;
                }
                _ => {
                    self.enter(&label, DispatchState::Failed);
                    self.log(
                        LogLevel::Warn,
                        format_args!(
                            "{label}: giving up after {} transmission(s): {error}",
                            attempt.transmissions
                        ),
                    );
                    return Err(error);
                }
            }
        }
    }

    /// Apply client defaults and encode the body
    fn build<T>(&self, request: &RequestDescriptor<T>, label: &str) -> Result<WireRequest> {
        let issues = request.issues();
        if !issues.is_empty() {
            let summary = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            if self.client.config.strict {
                return Err(Error::invalid_request(summary));
            }
            self.log(LogLevel::Warn, format_args!("{label}: {summary}"));
        }

        let mut url = self.resolve_url(request.path())?;
        if !request.query_pairs().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in request.query_pairs() {
                pairs.append_pair(key, value);
            }
        }

        let encoded = encode(request.request_body())?;

        let mut headers = self.client.default_headers.clone();
        if let Some(content_type) = &encoded.content_type {
            let value = HeaderValue::from_str(content_type).map_err(|_| {
                Error::encoding(format!("Invalid content type: {content_type}"))
            })?;
            headers.insert(CONTENT_TYPE, value);
        }
        for (key, value) in request.headers() {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| Error::invalid_request(format!("Invalid header name: {key}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::invalid_request(format!("Invalid value for header {key}")))?;
            headers.insert(name, value);
        }

        let body = if encoded.is_empty() {
            None
        } else {
            Some(encoded.bytes)
        };

        Ok(WireRequest {
            method: request.method(),
            url,
            headers,
            body,
            requires_auth: request.needs_auth(),
        })
    }

    /// Build full URL from path
    fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        match &self.client.base_url {
            Some(base) => {
                let base = base.as_str().trim_end_matches('/');
                let path = path.trim_start_matches('/');
                Ok(Url::parse(&format!("{base}/{path}"))?)
            }
            None => Err(Error::invalid_request(format!(
                "Relative path '{path}' needs a base URL"
            ))),
        }
    }

    /// Transmit with the effective timeout enforced here as well
    async fn transmit(
        &self,
        wire: WireRequest,
        timeout: Duration,
    ) -> Result<ResponseEnvelope> {
        match tokio::time::timeout(timeout, self.client.transport.transmit(wire, timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::transport(
                TransportErrorKind::Timeout,
                format!("No response within {timeout:?}"),
            )),
        }
    }

    /// Race a suspension point against cancellation
    async fn cancellable<F, R>(&self, label: &str, fut: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                self.enter(label, DispatchState::Cancelled);
                Err(Error::Cancelled)
            }
            outcome = fut => outcome,
        }
    }

    fn enter(&self, label: &str, state: DispatchState) {
        let level = match state {
            DispatchState::Cancelled => LogLevel::Info,
            _ => LogLevel::Trace,
        };
        self.log(level, format_args!("{label}: -> {state:?}"));
    }

    /// Emit an event if the client's log level allows it
    fn log(&self, level: LogLevel, message: std::fmt::Arguments<'_>) {
        if !self.client.config.log_level.allows(level) {
            return;
        }
        match level {
            LogLevel::Off => {}
            LogLevel::Error => error!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Info => info!("{message}"),
            LogLevel::Debug => debug!("{message}"),
            LogLevel::Trace => trace!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_without_deadline() {
        let attempt = Attempt::new(None);
        assert_eq!(attempt.number, 1);
        assert_eq!(attempt.transmissions, 0);
        assert!(attempt.allows(Duration::from_secs(3600)));
    }

    #[test]
    fn test_attempt_deadline() {
        let attempt = Attempt::new(Some(Duration::from_secs(1)));
        assert!(attempt.allows(Duration::from_millis(10)));
        assert!(!attempt.allows(Duration::from_secs(5)));
    }

    #[test]
    fn test_transmit_timeout_clamped_to_deadline() {
        let attempt = Attempt::new(Some(Duration::from_secs(1)));
        let budget = attempt.transmit_timeout(Duration::from_secs(30)).unwrap();
        assert!(budget <= Duration::from_secs(1));
        assert!(budget > Duration::from_millis(500));

        let short = attempt.transmit_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(short, Duration::from_millis(10));

        let unbounded = Attempt::new(None);
        assert_eq!(
            unbounded.transmit_timeout(Duration::from_secs(30)),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_transmit_timeout_after_deadline() {
        let attempt = Attempt::new(Some(Duration::ZERO));
        assert_eq!(attempt.transmit_timeout(Duration::from_secs(30)), None);
    }
}
