//! Response decoder module
//!
//! Supports: typed JSON, JSON at a nested path, empty bodies, raw bytes,
//! UTF-8 text, and caller-supplied closures.
//!
//! # Overview
//!
//! Every request descriptor carries a `ResponseDecoder<T>` that turns the
//! successful `ResponseEnvelope` into the caller's type. Decoding failures
//! are terminal and keep the raw body for diagnostics.

mod decoders;
mod types;

pub use decoders::{BytesDecoder, EmptyDecoder, FnDecoder, JsonDecoder, TextDecoder};
pub use types::ResponseDecoder;

#[cfg(test)]
mod tests;
