//! Common types used throughout Courier
//!
//! This module contains shared type definitions and type aliases used
//! across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Ordered list of string pairs (headers, query parameters, form fields)
pub type StringPairs = Vec<(String, String)>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl Method {
    /// Whether a request body is meaningful for this method
    pub fn allows_body(self) -> bool {
        !matches!(self, Method::GET | Method::DELETE)
    }

    /// Method name as it appears on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Log Level
// ============================================================================

/// Verbosity of the events a client emits
///
/// Ordered from quietest to noisiest, so `Info` allows `Warn` and `Error`
/// events but suppresses `Debug` and `Trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Whether an event at `event` level passes this verbosity
    pub fn allows(self, event: LogLevel) -> bool {
        event != LogLevel::Off && event <= self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_allows_body() {
        assert!(!Method::GET.allows_body());
        assert!(!Method::DELETE.allows_body());
        assert!(Method::POST.allows_body());
        assert!(Method::PUT.allows_body());
        assert!(Method::PATCH.allows_body());
    }

    #[test]
    fn test_method_serde() {
        let method: Method = serde_json::from_str("\"PATCH\"").unwrap();
        assert_eq!(method, Method::PATCH);
        assert_eq!(Method::DELETE.to_string(), "DELETE");
    }

    #[test]
    fn test_log_level_allows() {
        assert!(LogLevel::Info.allows(LogLevel::Warn));
        assert!(LogLevel::Info.allows(LogLevel::Info));
        assert!(!LogLevel::Info.allows(LogLevel::Debug));
        assert!(!LogLevel::Off.allows(LogLevel::Error));
        assert!(!LogLevel::Trace.allows(LogLevel::Off));
    }
}
