//! Conversions from external infrastructure errors into domain errors.

use std::io;

use cloudsdk_domain::CloudError;
use reqwest::Error as HttpError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(pub CloudError);

impl From<InfraError> for CloudError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CloudError> for InfraError {
    fn from(value: CloudError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCloudError {
    fn into_cloud(self) -> CloudError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CloudError */
/* -------------------------------------------------------------------------- */

impl IntoCloudError for HttpError {
    fn into_cloud(self) -> CloudError {
        if self.is_timeout() {
            return CloudError::Timeout;
        }

        if self.is_decode() {
            return CloudError::InvalidResponse(self.to_string());
        }

        if self.is_builder() {
            return CloudError::Config(self.to_string());
        }

        // Statuses are mapped by the connector from the response itself;
        // anything left here failed below the HTTP layer.
        CloudError::Connection(error_chain(&self))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_cloud())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error (blocking response bodies) → CloudError */
/* -------------------------------------------------------------------------- */

/// Map a failure while reading a blocking response body.
pub fn body_read_error(err: io::Error) -> CloudError {
    if err.kind() == io::ErrorKind::TimedOut {
        return CloudError::Timeout;
    }
    CloudError::Connection(format!("failed to read response body: {err}"))
}

/// `reqwest` keeps the useful part (refused, reset, dns) in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
