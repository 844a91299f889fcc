//! # Cloud SDK Infrastructure
//!
//! Network-facing implementation of the SDK.
//!
//! This crate contains:
//! - The retrying HTTP transport (tokio and blocking)
//! - API-key authentication behind a single-flight refresh gate
//! - The API connector and the files API (chunked uploads, ranged downloads)
//! - Configuration loading
//! - The `Client` / `AsyncClient` entry points
//!
//! ## Architecture
//! - Depends on `cloudsdk-domain` for types and `cloudsdk-common` for the
//!   byte-stream, retry and credential primitives
//! - Contains all I/O

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod files;
pub mod http;

// Re-export commonly used items
pub use api::{BlockingConnector, Connector};
pub use auth::{ApiKeyAuth, BlockingApiKeyAuth};
pub use client::{AsyncClient, Client};
pub use errors::InfraError;
pub use files::{AsyncFileContent, FileContent, FilesApi, FilesAsyncApi, UploadState};
pub use http::{BlockingHttpClient, HttpClient};
