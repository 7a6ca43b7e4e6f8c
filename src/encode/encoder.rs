//! Body encoding

use super::multipart::MultipartEncoder;
use crate::error::{Error, Result};
use crate::request::{FieldEncoding, RequestBody};
use crate::types::{JsonObject, JsonValue};
use bytes::Bytes;

/// `application/json`
pub const JSON: &str = "application/json";

/// `application/x-www-form-urlencoded`
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// `application/octet-stream`
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Encoded request payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedBody {
    /// Wire bytes
    pub bytes: Bytes,
    /// Content type, `None` only for an empty body
    pub content_type: Option<String>,
}

impl EncodedBody {
    fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: Some(content_type.into()),
        }
    }

    /// Check for the empty body
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none() && self.bytes.is_empty()
    }
}

/// Encode a request body
pub fn encode(body: &RequestBody) -> Result<EncodedBody> {
    match body {
        RequestBody::None => Ok(EncodedBody::default()),

        RequestBody::Fields {
            fields,
            encoding: FieldEncoding::Json,
        } => {
            let bytes = serde_json::to_vec(fields)
                .map_err(|e| Error::encoding(format!("Failed to serialize fields: {e}")))?;
            Ok(EncodedBody::new(bytes, JSON))
        }

        RequestBody::Fields {
            fields,
            encoding: FieldEncoding::UrlEncoded,
        } => Ok(EncodedBody::new(encode_form(fields), FORM_URLENCODED)),

        RequestBody::Encodable(value) => {
            let bytes = value
                .to_json()
                .map_err(|e| Error::encoding(format!("Failed to serialize body: {e}")))?;
            Ok(EncodedBody::new(bytes, JSON))
        }

        RequestBody::Raw { data, content_type } => Ok(EncodedBody::new(
            data.clone(),
            content_type.as_deref().unwrap_or(OCTET_STREAM),
        )),

        RequestBody::Multipart(parts) => {
            let encoder = MultipartEncoder::new(parts)?;
            let content_type = encoder.content_type();
            Ok(EncodedBody::new(encoder.encode(), content_type))
        }
    }
}

/// Encode fields as `application/x-www-form-urlencoded`
fn encode_form(fields: &JsonObject) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, &form_value(value));
    }
    serializer.finish()
}

fn form_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}
