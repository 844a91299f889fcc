//! Which failed requests may be sent again.
//!
//! A request is repeated only when all of these hold: its method is
//! idempotent, its body can be produced a second time, and the failure
//! happened in the transport. Timeouts and HTTP statuses are never retried
//! here.

use cloudsdk_common::resilience::{RetryDecision, RetryPolicy};
use cloudsdk_domain::{CloudError, ErrorCategory};
use reqwest::Method;

/// How a request body behaves on a second send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// No body; always safe to resend.
    Empty,
    /// Held in memory; every attempt sends the same bytes.
    Replayable,
    /// Single-use stream, possibly already partly consumed.
    Streaming,
}

impl BodyKind {
    /// Classify an async request body.
    pub fn of(request: &reqwest::Request) -> Self {
        match request.body() {
            None => Self::Empty,
            Some(body) if body.as_bytes().is_some() => Self::Replayable,
            Some(_) => Self::Streaming,
        }
    }

    /// Classify a blocking request body.
    pub fn of_blocking(request: &reqwest::blocking::Request) -> Self {
        match request.body() {
            None => Self::Empty,
            Some(body) if body.as_bytes().is_some() => Self::Replayable,
            Some(_) => Self::Streaming,
        }
    }
}

/// Coarse failure classes the decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Timeout,
    Other,
}

impl From<&CloudError> for FailureKind {
    fn from(error: &CloudError) -> Self {
        match error.category() {
            ErrorCategory::Transport => Self::Transport,
            ErrorCategory::Timeout => Self::Timeout,
            _ => Self::Other,
        }
    }
}

pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS)
}

/// Whether a request that failed with `failure` may be sent again.
///
/// The attempt budget is enforced by the executor, not here.
pub fn should_retry(method: &Method, body: BodyKind, failure: FailureKind) -> bool {
    failure == FailureKind::Transport && is_idempotent(method) && body != BodyKind::Streaming
}

/// [`RetryPolicy`] for one prepared request.
#[derive(Debug, Clone)]
pub struct HttpRetryPolicy {
    method: Method,
    body: BodyKind,
}

impl HttpRetryPolicy {
    pub fn new(method: Method, body: BodyKind) -> Self {
        Self { method, body }
    }

    pub fn for_request(request: &reqwest::Request) -> Self {
        Self::new(request.method().clone(), BodyKind::of(request))
    }

    pub fn for_blocking_request(request: &reqwest::blocking::Request) -> Self {
        Self::new(request.method().clone(), BodyKind::of_blocking(request))
    }
}

impl RetryPolicy<CloudError> for HttpRetryPolicy {
    fn should_retry(&self, error: &CloudError, _attempt: u32) -> RetryDecision {
        if should_retry(&self.method, self.body, FailureKind::from(error)) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// Requests that can produce a copy of themselves for another send.
pub(crate) trait Replay: Sized {
    fn replay(&self) -> Option<Self>;
}

impl Replay for reqwest::Request {
    fn replay(&self) -> Option<Self> {
        self.try_clone()
    }
}

impl Replay for reqwest::blocking::Request {
    fn replay(&self) -> Option<Self> {
        self.try_clone()
    }
}

/// Request for the next send: a copy while the body allows it, otherwise
/// the original, once.
pub(crate) fn next_attempt<R: Replay>(slot: &mut Option<R>) -> Option<R> {
    match slot.as_ref().and_then(Replay::replay) {
        Some(copy) => Some(copy),
        None => slot.take(),
    }
}
