//! API-key authentication
//!
//! The SDK exchanges its API key for a bearer token at `/auth/token` and
//! attaches the token to every request. Tokens are refreshed only when the
//! server rejects one; see [`cloudsdk_common::auth`] for the single-flight
//! gate.

pub mod api_key;

pub use api_key::{ApiKeyAuth, BlockingApiKeyAuth};
