//! HTTP client module
//!
//! Turns request descriptors into typed results.
//!
//! # Features
//!
//! - **Retries**: Configurable retry budget with backoff and `Retry-After`
//! - **Auth**: Credentials attached per request, refreshed on rejection
//! - **Cancellation**: Every wait races a `CancellationToken`

mod client;
mod dispatcher;

pub use client::{Client, ClientConfig, ClientConfigBuilder};
