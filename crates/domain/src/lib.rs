//! # Cloud SDK Domain
//!
//! Types shared by every layer of the SDK.
//!
//! This crate contains:
//! - The error taxonomy (`CloudError`) and `Result` alias
//! - Client configuration structures
//! - Wire views and protocol constants
//! - The `Content-Range` codec
//!
//! ## Architecture
//! - No dependencies on other SDK crates
//! - Pure data and parsing, no I/O

pub mod config;
pub mod constants;
pub mod durations;
pub mod errors;
pub mod range;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use range::{range_header, ContentRange};
pub use types::*;
