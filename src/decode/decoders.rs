//! Decoder implementations
//!
//! Each decoder handles one response shape.

use super::types::ResponseDecoder;
use crate::error::{Error, Result};
use crate::transport::ResponseEnvelope;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

// ============================================================================
// JSON Decoder
// ============================================================================

/// Typed JSON decoder with optional path extraction
pub struct JsonDecoder<T> {
    /// Dot path to the value to decode
    path: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Create a decoder for the whole body
    pub fn new() -> Self {
        Self {
            path: None,
            _marker: PhantomData,
        }
    }

    /// Create a decoder for the value found at a dot path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            _marker: PhantomData,
        }
    }

    /// The configured path, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("path", &self.path)
            .finish()
    }
}

impl<T> ResponseDecoder<T> for JsonDecoder<T>
where
    T: DeserializeOwned,
{
    fn decode(&self, envelope: &ResponseEnvelope) -> Result<T> {
        let body = &envelope.body;
        match &self.path {
            None => serde_json::from_slice(body)
                .map_err(|e| Error::decoding(format!("Failed to parse JSON: {e}"), body.clone())),
            Some(path) => {
                let value: Value = serde_json::from_slice(body).map_err(|e| {
                    Error::decoding(format!("Failed to parse JSON: {e}"), body.clone())
                })?;
                let found = extract_path(&value, path).ok_or_else(|| {
                    Error::decoding(format!("No value at path '{path}'"), body.clone())
                })?;
                serde_json::from_value(found.clone()).map_err(|e| {
                    Error::decoding(
                        format!("Failed to decode value at path '{path}': {e}"),
                        body.clone(),
                    )
                })
            }
        }
    }
}

/// Walk a dot path such as `data.items.0` or `$.data.items[-1]`
///
/// Numeric segments and bracket indices address arrays; negative indices
/// count from the end.
pub(crate) fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        let (name, index) = match part.find('[') {
            Some(bracket) if part.ends_with(']') => {
                (&part[..bracket], Some(&part[bracket + 1..part.len() - 1]))
            }
            _ => (part, None),
        };

        if !name.is_empty() {
            current = match current {
                Value::Array(items) => items.get(resolve_index(name, items.len())?)?,
                _ => current.get(name)?,
            };
        }

        if let Some(index) = index {
            match current {
                Value::Array(items) => current = items.get(resolve_index(index, items.len())?)?,
                _ => return None,
            }
        }
    }

    Some(current)
}

#[allow(clippy::cast_possible_wrap)]
fn resolve_index(raw: &str, len: usize) -> Option<usize> {
    let index: i64 = raw.parse().ok()?;
    let resolved = if index < 0 { len as i64 + index } else { index };
    usize::try_from(resolved).ok()
}

// ============================================================================
// Empty Decoder
// ============================================================================

/// Decoder for responses whose body is empty or irrelevant
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDecoder;

impl ResponseDecoder<()> for EmptyDecoder {
    fn decode(&self, _envelope: &ResponseEnvelope) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Bytes / Text Decoders
// ============================================================================

/// Passes the raw body through
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl ResponseDecoder<Bytes> for BytesDecoder {
    fn decode(&self, envelope: &ResponseEnvelope) -> Result<Bytes> {
        Ok(envelope.body.clone())
    }
}

/// Decodes the body as UTF-8 text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl ResponseDecoder<String> for TextDecoder {
    fn decode(&self, envelope: &ResponseEnvelope) -> Result<String> {
        String::from_utf8(envelope.body.to_vec()).map_err(|e| {
            Error::decoding(format!("Body is not valid UTF-8: {e}"), envelope.body.clone())
        })
    }
}

// ============================================================================
// Closure Decoder
// ============================================================================

/// Decoder backed by a closure
///
/// Use this for per-request decoding rules such as alternate date formats.
pub struct FnDecoder<F> {
    decode: F,
}

impl<F> FnDecoder<F> {
    /// Wrap a decode closure
    pub fn new(decode: F) -> Self {
        Self { decode }
    }
}

impl<T, F> ResponseDecoder<T> for FnDecoder<F>
where
    F: Fn(&ResponseEnvelope) -> Result<T> + Send + Sync,
{
    fn decode(&self, envelope: &ResponseEnvelope) -> Result<T> {
        (self.decode)(envelope)
    }
}

impl<F> std::fmt::Debug for FnDecoder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnDecoder").finish_non_exhaustive()
    }
}
