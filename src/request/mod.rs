//! Request descriptor module
//!
//! Describes one HTTP call: method, path, headers, query, body, auth
//! requirement, timeout, and the decoder for its response.

mod body;
mod descriptor;

pub use body::{EncodeJson, FieldEncoding, Part, RequestBody};
pub use descriptor::{DescriptorIssue, RequestDescriptor};
