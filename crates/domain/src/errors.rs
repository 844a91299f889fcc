//! Error types used throughout the SDK

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the API for non-success responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorView {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorView {
    /// Build a view carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    /// Decode a response body, falling back to the raw text as the message.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Self::message(String::from_utf8_lossy(body).trim().to_string()))
    }
}

impl fmt::Display for ErrorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (true, true) => f.write_str("no details"),
            (true, false) => f.write_str(&self.message),
            (false, true) => f.write_str(&self.code),
            (false, false) => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Coarse classification of [`CloudError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection could not be established or completed.
    Transport,
    /// Request exceeded its time budget.
    Timeout,
    /// Credential was rejected or access denied.
    Auth,
    /// Server refused the request content.
    Client,
    /// Server response broke the wire contract.
    Protocol,
    /// Local byte source failed.
    Io,
    /// Invalid client configuration.
    Config,
}

/// Main error type for the SDK
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("could not send request: {0}")]
    Connection(String),

    #[error("request timeout")]
    Timeout,

    #[error("unauthorized: {0}")]
    Unauthorized(ErrorView),

    #[error("invalid request: {0}")]
    InvalidRequest(ErrorView),

    #[error("forbidden: {0}")]
    Forbidden(ErrorView),

    #[error("resource not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(ErrorView),

    #[error("resource was modified by another request")]
    ResourceModified,

    #[error("request entity too large")]
    RequestEntityTooLarge,

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable,

    #[error("semantic error: {0}")]
    Semantic(ErrorView),

    #[error("unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("invalid content range: {0:?}")]
    InvalidContentRange(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CloudError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        match status {
            400 => Self::InvalidRequest(ErrorView::from_body(body)),
            401 => Self::Unauthorized(ErrorView::from_body(body)),
            403 => Self::Forbidden(ErrorView::from_body(body)),
            404 => Self::NotFound,
            409 => Self::Conflict(ErrorView::from_body(body)),
            412 => Self::ResourceModified,
            413 => Self::RequestEntityTooLarge,
            416 => Self::RangeNotSatisfiable,
            422 => Self::Semantic(ErrorView::from_body(body)),
            _ => Self::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(_) => ErrorCategory::Transport,
            Self::Timeout => ErrorCategory::Timeout,
            Self::Unauthorized(_) | Self::Forbidden(_) => ErrorCategory::Auth,
            Self::InvalidRequest(_)
            | Self::NotFound
            | Self::Conflict(_)
            | Self::ResourceModified
            | Self::RequestEntityTooLarge
            | Self::RangeNotSatisfiable
            | Self::Semantic(_) => ErrorCategory::Client,
            Self::UnexpectedStatus { .. }
            | Self::InvalidContentRange(_)
            | Self::InvalidResponse(_) => ErrorCategory::Protocol,
            Self::Io(_) => ErrorCategory::Io,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether repeating the same request could succeed.
    ///
    /// Only transport failures qualify; timeouts and every HTTP status are
    /// surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, CloudError>;
