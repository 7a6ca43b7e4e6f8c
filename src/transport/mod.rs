//! Transport module
//!
//! The boundary between the dispatcher and the network. The dispatcher only
//! ever talks to a `Transport`; `ReqwestTransport` is the default one.

mod reqwest_transport;
mod types;

pub use reqwest_transport::ReqwestTransport;
pub use types::{ResponseEnvelope, Transport, WireRequest};
