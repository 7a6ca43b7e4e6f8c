//! multipart/form-data encoding

use crate::error::{Error, Result};
use crate::request::Part;
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Boundary generation attempts before giving up
const MAX_BOUNDARY_ATTEMPTS: usize = 8;

/// Encoder for one multipart body
#[derive(Debug)]
pub struct MultipartEncoder<'a> {
    parts: &'a [Part],
    boundary: String,
}

impl<'a> MultipartEncoder<'a> {
    /// Create an encoder with a random boundary that does not occur in any part
    pub fn new(parts: &'a [Part]) -> Result<Self> {
        for _ in 0..MAX_BOUNDARY_ATTEMPTS {
            let boundary = format!("courier-{}", Uuid::new_v4().simple());
            if !collides(parts, &boundary) {
                return Ok(Self { parts, boundary });
            }
        }
        Err(Error::encoding(
            "Could not generate a multipart boundary absent from the part contents",
        ))
    }

    /// Create an encoder with a fixed boundary
    pub fn with_boundary(parts: &'a [Part], boundary: impl Into<String>) -> Result<Self> {
        let boundary = boundary.into();
        if boundary.is_empty() || boundary.len() > 70 {
            return Err(Error::encoding(format!(
                "Multipart boundary must be 1-70 characters, got {}",
                boundary.len()
            )));
        }
        if collides(parts, &boundary) {
            return Err(Error::encoding(format!(
                "Multipart boundary '{boundary}' occurs in part content"
            )));
        }
        Ok(Self { parts, boundary })
    }

    /// The boundary in use
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Content type header value including the boundary
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write every part in order, followed by the closing delimiter
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for part in self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            let mut disposition = format!(
                "Content-Disposition: form-data; name=\"{}\"",
                escape_quoted(&part.name)
            );
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
            }
            buf.put_slice(disposition.as_bytes());
            buf.put_slice(b"\r\n");

            if let Some(mime_type) = &part.mime_type {
                buf.put_slice(format!("Content-Type: {mime_type}\r\n").as_bytes());
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");
        buf.freeze()
    }
}

fn collides(parts: &[Part], boundary: &str) -> bool {
    let needle = boundary.as_bytes();
    parts.iter().any(|part| {
        contains(&part.data, needle)
            || part.name.contains(boundary)
            || part.filename.as_deref().is_some_and(|f| f.contains(boundary))
    })
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}

/// Percent-escape characters that would break a quoted header parameter
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
