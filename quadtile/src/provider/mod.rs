//! Tile download abstraction.
//!
//! Workers fetch tile bytes through the [`HttpClient`] trait so the network
//! can be replaced with a mock in tests. [`ReqwestClient`] is the production
//! implementation: a blocking client, so each worker has at most one request
//! outstanding.

mod http;
mod types;

pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::MockHttpClient;
