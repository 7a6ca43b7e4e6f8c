//! Decoder trait
//!
//! Defines the serialization boundary between a transport response and the
//! caller's typed value.

use crate::error::Result;
use crate::transport::ResponseEnvelope;

/// Trait for decoding a successful response into a typed value
pub trait ResponseDecoder<T>: Send + Sync {
    /// Decode the response envelope
    fn decode(&self, envelope: &ResponseEnvelope) -> Result<T>;
}
