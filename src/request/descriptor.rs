//! Request descriptor
//!
//! A `RequestDescriptor<T>` describes one call and how its response becomes
//! a `T`. Builder methods consume and return the descriptor; once handed to
//! a client it is only read.

use super::body::{EncodeJson, FieldEncoding, Part, RequestBody};
use crate::decode::{BytesDecoder, EmptyDecoder, JsonDecoder, ResponseDecoder, TextDecoder};
use crate::types::{JsonObject, JsonValue, Method, StringPairs};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Sanity problems found on a descriptor
///
/// A descriptor with issues can still be built and sent; only strict-mode
/// clients refuse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorIssue {
    /// GET or DELETE carrying a body
    BodyOnBodylessMethod(Method),
    /// A header override replaces the content type the body would set
    ContentTypeOverride,
}

impl std::fmt::Display for DescriptorIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorIssue::BodyOnBodylessMethod(method) => {
                write!(f, "{method} request carries a body")
            }
            DescriptorIssue::ContentTypeOverride => {
                f.write_str("Content-Type header overrides the body content type")
            }
        }
    }
}

/// Immutable description of one HTTP call
pub struct RequestDescriptor<T = JsonValue> {
    method: Method,
    path: String,
    headers: StringPairs,
    query: StringPairs,
    body: RequestBody,
    requires_auth: bool,
    timeout: Option<Duration>,
    decoder: Arc<dyn ResponseDecoder<T>>,
}

impl<T> RequestDescriptor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Create a descriptor that decodes the response body as JSON
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::None,
            requires_auth: true,
            timeout: None,
            decoder: Arc::new(JsonDecoder::<T>::new()),
        }
    }

    /// Create a GET descriptor
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST descriptor
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Create a PUT descriptor
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Create a PATCH descriptor
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Create a DELETE descriptor
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Decode the JSON value found at a dot path instead of the whole body
    #[must_use]
    pub fn decode_at(self, path: impl Into<String>) -> Self {
        self.with_decoder(Arc::new(JsonDecoder::<T>::with_path(path)))
    }
}

impl<T> RequestDescriptor<T> {
    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    /// Add a header override
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Append a query parameter (duplicates are kept, in order)
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark the request as not needing credentials
    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Set whether the request needs credentials
    #[must_use]
    pub fn requires_auth(mut self, requires: bool) -> Self {
        self.requires_auth = requires;
        self
    }

    /// Set a serializable body, encoded as JSON
    #[must_use]
    pub fn json<B>(mut self, body: B) -> Self
    where
        B: Serialize + Send + Sync + 'static,
    {
        self.body = RequestBody::Encodable(Arc::new(body) as Arc<dyn EncodeJson>);
        self
    }

    /// Set a key-value body encoded as a JSON object
    #[must_use]
    pub fn fields(mut self, fields: JsonObject) -> Self {
        self.body = RequestBody::Fields {
            fields,
            encoding: FieldEncoding::Json,
        };
        self
    }

    /// Set a key-value body encoded as `application/x-www-form-urlencoded`
    #[must_use]
    pub fn form(mut self, fields: JsonObject) -> Self {
        self.body = RequestBody::Fields {
            fields,
            encoding: FieldEncoding::UrlEncoded,
        };
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn bytes(mut self, data: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        self.body = RequestBody::Raw {
            data: data.into(),
            content_type: content_type.map(String::from),
        };
        self
    }

    /// Set a multipart/form-data body
    #[must_use]
    pub fn multipart(mut self, parts: Vec<Part>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Set any body variant
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    // ------------------------------------------------------------------------
    // Decode strategy
    // ------------------------------------------------------------------------

    /// Expect an empty (or ignored) response body
    pub fn expect_empty(self) -> RequestDescriptor<()> {
        self.with_decoder(Arc::new(EmptyDecoder))
    }

    /// Return the raw response bytes
    pub fn expect_bytes(self) -> RequestDescriptor<Bytes> {
        self.with_decoder(Arc::new(BytesDecoder))
    }

    /// Return the response body as UTF-8 text
    pub fn expect_text(self) -> RequestDescriptor<String> {
        self.with_decoder(Arc::new(TextDecoder))
    }

    /// Decode the response with a custom decoder
    pub fn decode_with<U, D>(self, decoder: D) -> RequestDescriptor<U>
    where
        D: ResponseDecoder<U> + 'static,
    {
        self.with_decoder(Arc::new(decoder))
    }

    fn with_decoder<U>(self, decoder: Arc<dyn ResponseDecoder<U>>) -> RequestDescriptor<U> {
        RequestDescriptor {
            method: self.method,
            path: self.path,
            headers: self.headers,
            query: self.query,
            body: self.body,
            requires_auth: self.requires_auth,
            timeout: self.timeout,
            decoder,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn request_body(&self) -> &RequestBody {
        &self.body
    }

    pub fn needs_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn decoder(&self) -> &dyn ResponseDecoder<T> {
        self.decoder.as_ref()
    }

    /// Sanity problems with this descriptor
    pub fn issues(&self) -> Vec<DescriptorIssue> {
        let mut issues = Vec::new();
        if !self.body.is_none() && !self.method.allows_body() {
            issues.push(DescriptorIssue::BodyOnBodylessMethod(self.method));
        }
        let overrides_content_type = self
            .headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case("content-type"));
        if overrides_content_type && !self.body.is_none() {
            issues.push(DescriptorIssue::ContentTypeOverride);
        }
        issues
    }
}

impl<T> Clone for RequestDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            path: self.path.clone(),
            headers: self.headers.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
            requires_auth: self.requires_auth,
            timeout: self.timeout,
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<T> std::fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("requires_auth", &self.requires_auth)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
