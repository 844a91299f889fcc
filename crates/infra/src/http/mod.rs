//! HTTP transport with retries
//!
//! [`HttpClient`] and [`BlockingHttpClient`] wrap the `reqwest` clients for
//! the two execution models. Both apply the connection settings of
//! [`ClientConfig`](cloudsdk_domain::ClientConfig) and run every request
//! through the retry governor with an [`HttpRetryPolicy`].

pub mod blocking;
pub mod client;
pub mod policy;
pub mod status;

pub use blocking::BlockingHttpClient;
pub use client::HttpClient;
pub use policy::{should_retry, BodyKind, FailureKind, HttpRetryPolicy};
