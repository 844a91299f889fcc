//! Bearer credential caching with single-flight refresh
//!
//! A [`CredentialCache`] holds one credential string (empty until the first
//! refresh). [`RefreshGate`] (threads) and [`AsyncRefreshGate`] (tokio tasks)
//! wrap outgoing requests with the reactive refresh protocol:
//!
//! 1. Send with the cached credential, lock-free. Anything but a rejection
//!    is returned as-is.
//! 2. On rejection, or when nothing is cached yet, take the gate. If the
//!    cached credential still equals the one observed before sending, refresh
//!    it exactly once; otherwise another caller already did and its result is
//!    reused.
//! 3. Send once more and return that outcome unconditionally.
//!
//! No expiry clock is kept; refresh only ever follows a rejection.

mod credential;

pub use credential::{AsyncRefreshGate, CredentialCache, RefreshGate};
