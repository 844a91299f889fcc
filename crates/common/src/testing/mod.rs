//! Testing utilities and helpers
//!
//! - **[`sources`]**: fabricated byte sources with controlled chunking and
//!   failures, plus deterministic payload generators
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::io::Read;
//!
//! use cloudsdk_common::testing::{pattern, ChunkedSource};
//!
//! let mut source = ChunkedSource::new(pattern(10), 3);
//! let mut buf = [0u8; 8];
//! assert_eq!(source.read(&mut buf).unwrap(), 3);
//! ```

pub mod sources;

pub use sources::{pattern, random_bytes_seeded, ChunkedSource, FailingSource};
