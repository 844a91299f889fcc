//! Error conversions for infrastructure failures

pub mod conversions;

pub use conversions::{body_read_error, InfraError};
