//! Body encoder module
//!
//! Converts a `RequestBody` into wire bytes plus the content type that
//! describes them.

mod encoder;
mod multipart;

pub use encoder::{encode, EncodedBody, FORM_URLENCODED, JSON, OCTET_STREAM};
pub use multipart::MultipartEncoder;
