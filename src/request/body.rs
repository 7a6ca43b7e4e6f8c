//! Request body variants
//!
//! Bodies are stored unencoded; the encoder turns them into wire bytes when
//! the request is built.

use crate::types::JsonObject;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

/// How a key-value map body goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldEncoding {
    /// `application/json` object
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`
    UrlEncoded,
}

/// Anything that can be serialized into a JSON request body
///
/// Blanket-implemented for every `Serialize` type, so callers never
/// implement it by hand.
pub trait EncodeJson: Send + Sync {
    /// Serialize into JSON bytes
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T> EncodeJson for T
where
    T: Serialize + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// One part of a multipart/form-data body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Form field name
    pub name: String,
    /// File name reported to the server
    pub filename: Option<String>,
    /// MIME type of the content
    pub mime_type: Option<String>,
    /// Part content
    pub data: Bytes,
}

impl Part {
    /// Create a plain text field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            mime_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// Create a file part
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            mime_type: Some(mime_type.into()),
            data: data.into(),
        }
    }
}

/// Request body
#[derive(Clone, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// Key-value map
    Fields {
        fields: JsonObject,
        encoding: FieldEncoding,
    },
    /// Any serializable value, encoded as JSON
    Encodable(Arc<dyn EncodeJson>),
    /// Raw bytes passed through unchanged
    Raw {
        data: Bytes,
        content_type: Option<String>,
    },
    /// multipart/form-data parts, in order
    Multipart(Vec<Part>),
}

impl RequestBody {
    /// Check if there is no body
    pub fn is_none(&self) -> bool {
        matches!(self, RequestBody::None)
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::None => f.write_str("None"),
            RequestBody::Fields { fields, encoding } => f
                .debug_struct("Fields")
                .field("fields", fields)
                .field("encoding", encoding)
                .finish(),
            RequestBody::Encodable(_) => f.write_str("Encodable(..)"),
            RequestBody::Raw { data, content_type } => f
                .debug_struct("Raw")
                .field("len", &data.len())
                .field("content_type", content_type)
                .finish(),
            RequestBody::Multipart(parts) => f
                .debug_struct("Multipart")
                .field("parts", &parts.len())
                .finish(),
        }
    }
}
