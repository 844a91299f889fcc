//! Execution-model-agnostic building blocks shared across the SDK crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error and randomness dependencies only
//! - `runtime`: byte-source primitives, retry governor, credential gate
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: fabricated byte sources for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod io;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{AsyncRefreshGate, CredentialCache, RefreshGate};
#[cfg(feature = "runtime")]
pub use io::{
    AsyncBufferedReader, AsyncLimitedReader, AsyncPart, AsyncPartSplitter, BufferedReader,
    LimitedReader, Part, PartSplitter,
};
#[cfg(feature = "runtime")]
pub use resilience::{BackoffRange, RetryConfig, RetryDecision, RetryExecutor, RetryPolicy};
