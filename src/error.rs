//! Error types for Courier
//!
//! This module defines the error taxonomy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Classification of transport-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request did not complete within its timeout
    Timeout,
    /// No connection could be established
    Connect,
    /// Any other failure while sending or reading the response
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Timeout => f.write_str("timeout"),
            TransportErrorKind::Connect => f.write_str("connection failure"),
            TransportErrorKind::Other => f.write_str("transport failure"),
        }
    }
}

/// The main error type for Courier
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Transmission Errors
    // ============================================================================
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("HTTP {status}: {}", String::from_utf8_lossy(.body))]
    HttpStatus {
        status: u16,
        body: Bytes,
        retry_after: Option<Duration>,
    },

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ============================================================================
    // Body Errors
    // ============================================================================
    #[error("Failed to encode request body: {message}")]
    Encoding { message: String },

    #[error("Failed to decode response: {message}")]
    Decoding { message: String, body: Bytes },

    // ============================================================================
    // Caller Errors
    // ============================================================================
    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport error
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<Bytes>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error that keeps the raw body for diagnostics
    pub fn decoding(message: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::Decoding {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Check if this error kind is retryable at all
    ///
    /// Status errors are only candidates; the retry policy decides which
    /// status classes it actually retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { kind, .. } => {
                matches!(kind, TransportErrorKind::Timeout | TransportErrorKind::Connect)
            }
            Error::HttpStatus { status, .. } => *status != 401,
            _ => false,
        }
    }
}

/// Result type alias for Courier
pub type Result<T> = std::result::Result<T, Error>;
