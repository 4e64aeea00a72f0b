//! `HttpClient` implementations.
//!
//! - `ReqwestClient` - production client over `reqwest`
//! - `RateLimitedClient` - wrapper that paces any inner client

pub mod rate_limited;
pub mod reqwest_client;

pub use rate_limited::{RateLimitedClient, RateLimitedClientBuilder};
pub use reqwest_client::ReqwestClient;
