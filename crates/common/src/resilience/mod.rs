//! Resilience patterns for transient failures
//!
//! [`retry`] provides the retry governor: a bounded number of attempts with a
//! uniformly random pause between them. The governor is generic over the
//! error type; callers decide which failures are worth repeating through a
//! [`RetryPolicy`]. The HTTP-specific policy lives with the transport in the
//! infra crate.

pub mod retry;

pub use retry::{
    policies, BackoffRange, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
