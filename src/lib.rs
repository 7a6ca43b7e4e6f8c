// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Courier
//!
//! Typed HTTP request dispatch: describe a call once, send it, get a typed
//! result back.
//!
//! ## Features
//!
//! - **Request Descriptors**: Method, path, query, headers, body and decoder in one value
//! - **Body Encoding**: JSON, form-urlencoded, raw bytes, and multipart/form-data
//! - **Retries**: Bounded retry budget with constant, linear or exponential backoff
//! - **Auth Refresh**: Concurrent 401s share a single credential refresh
//! - **Cancellation**: Every call can be abandoned at any wait point
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::{Client, ClientConfig, RequestDescriptor, Result};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::builder()
//!         .base_url("https://api.example.com")
//!         .max_retries(3)
//!         .build();
//!     let client = Client::new(config)?;
//!
//!     let user = client
//!         .send(&RequestDescriptor::<User>::get("/users/1"))
//!         .await?;
//!     println!("{} {}", user.id, user.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Client::send(&RequestDescriptor<T>)             │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  Encode  │   Auth    │   Dispatcher  │   Retry   │   Decode    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ JSON     │ Bearer    │ Build         │ Budget    │ JSON        │
//! │ Form     │ Refresh   │ Authorize     │ Backoff   │ JSON path   │
//! │ Raw      │ OAuth2    │ Send          │ Statuses  │ Text/Bytes  │
//! │ Multipart│           │ Cancel        │           │ Custom      │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//!                                │
//!                         Transport (reqwest)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Request descriptors and bodies
pub mod request;

/// Request body encoding
pub mod encode;

/// Response decoders
pub mod decode;

/// Authentication providers and token refresh
pub mod auth;

/// Retry policy and backoff
pub mod retry;

/// Network transport
pub mod transport;

/// Client and dispatcher
pub mod http;

/// YAML client settings
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result, TransportErrorKind};
pub use types::*;

// Re-export commonly used types
pub use auth::{AuthProvider, Credential, NoAuth, RefreshableBearer, StaticBearer};
pub use config::ClientSettings;
pub use http::{Client, ClientConfig, ClientConfigBuilder};
pub use request::{Part, RequestBody, RequestDescriptor};
pub use retry::{RetryPolicy, StatusRule};
pub use tokio_util::sync::CancellationToken;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
