//! Authentication module
//!
//! Supports: no auth, static bearer tokens, and refreshable bearer tokens.
//!
//! `RefreshableBearer` keeps the shared `Credential` and runs at most one
//! refresh at a time; every request that finds the credential rejected or
//! expired while a refresh is running waits for that refresh instead of
//! starting its own.

mod provider;
mod refresher;
mod types;

pub use provider::{AuthProvider, NoAuth, RefreshableBearer, StaticBearer};
pub use refresher::{refresh_fn, FnRefresher, OAuth2Refresher, TokenRefresher};
pub use types::{AuthStamp, Credential};

#[cfg(test)]
mod tests;
