//! Files API for the threaded execution model.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use cloudsdk_common::io::{LimitedReader, PartSplitter};
use cloudsdk_domain::constants::{
    BUFFER_PULL_SIZE, DEFAULT_PART_SIZE, FILES_PATH, MULTIPART_UPLOAD_MAX_SIZE, SESSIONS_PATH,
};
use cloudsdk_domain::{range_header, FileRef, Result, SessionForm, SessionRef};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Response;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::Method;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::content::{FileContent, RangePlan};
use super::multipart::stream_body_blocking;
use super::state::UploadState;
use super::{content_path, file_size, PART_FILE_NAME, SPLIT_SIZE};
use crate::api::BlockingConnector;
use crate::errors::body_read_error;
use crate::http::status;

/// Files API.
#[derive(Debug, Clone)]
pub struct FilesApi {
    connector: Arc<BlockingConnector>,
    single_upload_limit: u64,
}

impl FilesApi {
    /// Files API over a shared connector.
    pub fn new(connector: Arc<BlockingConnector>) -> Self {
        Self { connector, single_upload_limit: MULTIPART_UPLOAD_MAX_SIZE }
    }

    /// Largest known size still sent as one request; bigger uploads open a
    /// session. Defaults to 50 MiB.
    #[must_use]
    pub fn with_single_upload_limit(mut self, limit: u64) -> Self {
        self.single_upload_limit = limit;
        self
    }

    pub fn single_upload_limit(&self) -> u64 {
        self.single_upload_limit
    }

    /// Upload a file.
    ///
    /// With a known `size` within the single upload limit the file is sent in a single
    /// `PUT /filebox/files`; otherwise it goes through an upload session in
    /// 5 MiB parts.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` or `RequestEntityTooLarge` when the server refuses
    /// the data, `Io` when `source` fails.
    #[instrument(skip(self, source), fields(name = %name, size = ?size))]
    pub fn upload<R>(&self, source: R, name: &str, size: Option<u64>) -> Result<FileRef>
    where
        R: Read + Send,
    {
        match size {
            Some(size) if size <= self.single_upload_limit => {
                self.upload_single(source, name, size)
            }
            _ => self.upload_by_parts(source, size),
        }
    }

    fn upload_single<R: Read + Send>(&self, source: R, name: &str, size: u64) -> Result<FileRef> {
        let reader = LimitedReader::new(source, size);
        let response = stream_body_blocking(reader, |body| {
            let file = Part::reader_with_length(body, size).file_name(name.to_string());
            let form = Form::new().part("file", file);
            self.connector.send(self.connector.request(Method::PUT, FILES_PATH)?.multipart(form))
        })?;
        status::json_blocking(response)
    }

    fn upload_by_parts<R: Read + Send>(&self, source: R, size: Option<u64>) -> Result<FileRef> {
        let mut state = UploadState::default();
        let session = self.create_session(DEFAULT_PART_SIZE)?;
        state.session_opened(session.id);

        let mut splitter = PartSplitter::new(source, SPLIT_SIZE, size);
        while let Some(part) = splitter.next_part()? {
            let (number, len) = (part.number(), part.len());
            self.upload_session_part(part, session.id, number, len)?;
            state.part_uploaded(number);
        }

        let (parts, bytes) = (state.parts_done(), splitter.offset());
        let file = self.complete_session(session.id)?;
        state.completed(file.id);
        info!(file_id = %file.id, parts, bytes, "upload completed");
        Ok(file)
    }

    /// Open an upload session (`POST /filebox/sessions`).
    #[instrument(skip(self))]
    pub fn create_session(&self, part_size: u64) -> Result<SessionRef> {
        let response = self.connector.post_json(SESSIONS_PATH, &SessionForm { part_size })?;
        let session: SessionRef = status::json_blocking(response)?;
        debug!(session_id = %session.id, "upload session opened");
        Ok(session)
    }

    /// Upload one part of a session (`PUT /filebox/sessions/{id}/parts`).
    ///
    /// `part` must yield exactly `size` bytes.
    #[instrument(skip(self, part), fields(session_id = %session_id))]
    pub fn upload_session_part<R>(
        &self,
        part: R,
        session_id: Uuid,
        part_number: u32,
        size: u64,
    ) -> Result<()>
    where
        R: Read + Send,
    {
        let path = format!("{SESSIONS_PATH}/{session_id}/parts");
        stream_body_blocking(part, |body| {
            let form = Form::new()
                .text("number", part_number.to_string())
                .text("partSize", size.to_string())
                .part("filePart", Part::reader_with_length(body, size).file_name(PART_FILE_NAME));
            self.connector.send(self.connector.request(Method::PUT, &path)?.multipart(form))
        })?;
        Ok(())
    }

    /// Complete a session (`POST /filebox/sessions/{id}/completed`).
    #[instrument(skip(self))]
    pub fn complete_session(&self, session_id: Uuid) -> Result<FileRef> {
        let response = self.connector.post(&format!("{SESSIONS_PATH}/{session_id}/completed"))?;
        status::json_blocking(response)
    }

    /// Size of a stored file (`HEAD /filebox/files/{id}/content`).
    #[instrument(skip(self))]
    pub fn get_file_size(&self, file_id: Uuid) -> Result<u64> {
        let response = self.connector.head(&content_path(file_id))?;
        file_size(response.headers())
    }

    /// Download the inclusive byte range `[start, end]` of a file.
    #[instrument(skip(self))]
    pub fn download_part(&self, file_id: Uuid, start: u64, end: u64) -> Result<FileContent> {
        let connector = Arc::clone(&self.connector);
        let chunks = RangeChunks::open(connector, file_id, RangePlan::single(), (start, end))?;
        Ok(FileContent::new(chunks))
    }

    /// Download a whole file with successive 5 MiB range requests.
    ///
    /// The first request is sent before this returns; later ones are sent
    /// as the content is read.
    #[instrument(skip(self))]
    pub fn download(&self, file_id: Uuid) -> Result<FileContent> {
        let connector = Arc::clone(&self.connector);
        let window = (0, DEFAULT_PART_SIZE);
        let chunks = RangeChunks::open(connector, file_id, RangePlan::chained(), window)?;
        Ok(FileContent::new(chunks))
    }
}

/// Network chunks of a ranged download over blocking responses.
pub struct RangeChunks {
    connector: Arc<BlockingConnector>,
    path: String,
    plan: RangePlan,
    response: Option<Response>,
    buf: Box<[u8]>,
}

impl RangeChunks {
    /// Opens the first window before returning.
    fn open(
        connector: Arc<BlockingConnector>,
        file_id: Uuid,
        plan: RangePlan,
        (start, end): (u64, u64),
    ) -> Result<Self> {
        let mut chunks = Self {
            connector,
            path: content_path(file_id),
            plan,
            response: None,
            buf: vec![0; BUFFER_PULL_SIZE].into_boxed_slice(),
        };
        chunks.fetch(start, end)?;
        Ok(chunks)
    }

    fn fetch(&mut self, start: u64, end: u64) -> Result<()> {
        debug!(path = %self.path, start, end, "requesting range");
        let builder =
            self.connector.request(Method::GET, &self.path)?.header(RANGE, range_header(start, end));
        let response = self.connector.send(builder)?;
        self.plan.record(response.status(), response.headers().get(CONTENT_RANGE))?;
        self.response = Some(response);
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(response) = self.response.as_mut() {
                let n = read_retrying(response, &mut self.buf).map_err(body_read_error)?;
                if n > 0 {
                    return Ok(Some(Bytes::copy_from_slice(&self.buf[..n])));
                }
                self.response = None;
            }
            let Some((start, end)) = self.plan.next_window() else {
                return Ok(None);
            };
            self.fetch(start, end)?;
        }
    }
}

impl Iterator for RangeChunks {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl std::fmt::Debug for RangeChunks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeChunks")
            .field("path", &self.path)
            .field("plan", &self.plan)
            .field("open", &self.response.is_some())
            .finish()
    }
}

fn read_retrying(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
