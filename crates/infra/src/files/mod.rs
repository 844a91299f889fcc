//! Chunked file transfers
//!
//! Uploads pick between a single multipart request and the session protocol
//! (open a session, upload numbered parts, complete it). Downloads chain
//! ranged requests and expose the bytes through `read(n)`.
//!
//! [`FilesApi`] serves the threaded model and [`FilesAsyncApi`] the tokio
//! model; both behave identically.

pub mod api;
pub mod blocking;
pub mod content;
mod multipart;
pub mod state;

pub use api::FilesAsyncApi;
pub use blocking::{FilesApi, RangeChunks};
pub use content::{AsyncFileContent, FileContent};
pub use state::UploadState;

use cloudsdk_domain::constants::{DEFAULT_PART_SIZE, FILES_PATH};
use cloudsdk_domain::{CloudError, Result};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use uuid::Uuid;

/// Part size as a buffer length; 5 MiB fits every supported `usize`.
#[allow(clippy::cast_possible_truncation)]
const SPLIT_SIZE: usize = DEFAULT_PART_SIZE as usize;

/// File name sent with session parts.
const PART_FILE_NAME: &str = "upload";

fn content_path(file_id: Uuid) -> String {
    format!("{FILES_PATH}/{file_id}/content")
}

/// `Content-Length` of a `HEAD` response; absent or blank means empty.
fn file_size(headers: &HeaderMap) -> Result<u64> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(0);
    };
    let invalid = || {
        CloudError::InvalidResponse(format!("invalid Content-Length header: {value:?}"))
    };
    let text = value.to_str().map_err(|_| invalid())?.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse().map_err(|_| invalid())
}
