//! Retry policy module
//!
//! Decides whether a failed attempt is tried again and how long to wait
//! first. Authentication-triggered retries are handled by the auth module
//! and never consume this budget.

mod policy;

pub use policy::{RetryDecision, RetryPolicy, StatusRule};
