//! Mapping of non-success responses to [`CloudError`].
//!
//! The body of a failed response is read in full so the error carries the
//! server's explanation.

use cloudsdk_domain::{CloudError, Result};

use crate::errors::InfraError;

/// Pass a success response through; turn anything else into an error.
pub async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.map_err(|err| CloudError::from(InfraError::from(err)))?;
    Err(CloudError::from_status(status.as_u16(), &body))
}

/// Blocking twin of [`check`].
pub fn check_blocking(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().map_err(|err| CloudError::from(InfraError::from(err)))?;
    Err(CloudError::from_status(status.as_u16(), &body))
}

/// Read a response body as JSON.
pub async fn json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response.json().await.map_err(|err| CloudError::from(InfraError::from(err)))
}

pub fn json_blocking<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T> {
    let body = response.bytes().map_err(|err| CloudError::from(InfraError::from(err)))?;
    serde_json::from_slice(&body).map_err(|err| CloudError::InvalidResponse(err.to_string()))
}

