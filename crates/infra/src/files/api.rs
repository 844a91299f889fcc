//! Files API for the tokio execution model.

use std::sync::Arc;

use bytes::Bytes;
use cloudsdk_common::io::{AsyncLimitedReader, AsyncPartSplitter};
use cloudsdk_domain::constants::{
    DEFAULT_PART_SIZE, FILES_PATH, MULTIPART_UPLOAD_MAX_SIZE, SESSIONS_PATH,
};
use cloudsdk_domain::{range_header, CloudError, FileRef, Result, SessionForm, SessionRef};
use futures::stream::{self, StreamExt};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use tokio::io::AsyncRead;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::content::{AsyncFileContent, RangePlan};
use super::multipart::stream_body;
use super::state::UploadState;
use super::{content_path, file_size, PART_FILE_NAME, SPLIT_SIZE};
use crate::api::Connector;
use crate::errors::InfraError;
use crate::http::status;

/// Files asynchronous API.
#[derive(Debug, Clone)]
pub struct FilesAsyncApi {
    connector: Arc<Connector>,
    single_upload_limit: u64,
}

impl FilesAsyncApi {
    /// Files API over a shared connector.
    pub fn new(connector: Arc<Connector>) -> Self {
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
    pub async fn upload<R>(&self, source: R, name: &str, size: Option<u64>) -> Result<FileRef>
    where
        R: AsyncRead + Unpin,
    {
        match size {
            Some(size) if size <= self.single_upload_limit => {
                self.upload_single(source, name, size).await
            }
            _ => self.upload_by_parts(source, size).await,
        }
    }

    async fn upload_single<R>(&self, source: R, name: &str, size: u64) -> Result<FileRef>
    where
        R: AsyncRead + Unpin,
    {
        let reader = AsyncLimitedReader::new(source, size);
        let file_name = name.to_string();
        let response = stream_body(reader, |body| async move {
            let form = Form::new()
                .part("file", Part::stream_with_length(body, size).file_name(file_name));
            self.connector.send(self.connector.request(Method::PUT, FILES_PATH)?.multipart(form)).await
        })
        .await?;
        status::json(response).await
    }

    async fn upload_by_parts<R>(&self, source: R, size: Option<u64>) -> Result<FileRef>
    where
        R: AsyncRead + Unpin,
    {
        let mut state = UploadState::default();
        let session = self.create_session(DEFAULT_PART_SIZE).await?;
        state.session_opened(session.id);

        let mut splitter = AsyncPartSplitter::new(source, SPLIT_SIZE, size);
        while let Some(part) = splitter.next_part().await? {
            let (number, len) = (part.number(), part.len());
            self.upload_session_part(part, session.id, number, len).await?;
            state.part_uploaded(number);
        }

        let (parts, bytes) = (state.parts_done(), splitter.offset());
        let file = self.complete_session(session.id).await?;
        state.completed(file.id);
        info!(file_id = %file.id, parts, bytes, "upload completed");
        Ok(file)
    }

    /// Open an upload session (`POST /filebox/sessions`).
    #[instrument(skip(self))]
    pub async fn create_session(&self, part_size: u64) -> Result<SessionRef> {
        let response = self.connector.post_json(SESSIONS_PATH, &SessionForm { part_size }).await?;
        let session: SessionRef = status::json(response).await?;
        debug!(session_id = %session.id, "upload session opened");
        Ok(session)
    }

    /// Upload one part of a session (`PUT /filebox/sessions/{id}/parts`).
    ///
    /// `part` must yield exactly `size` bytes.
    #[instrument(skip(self, part), fields(session_id = %session_id))]
    pub async fn upload_session_part<R>(
        &self,
        part: R,
        session_id: Uuid,
        part_number: u32,
        size: u64,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let path = format!("{SESSIONS_PATH}/{session_id}/parts");
        stream_body(part, |body| async move {
            let form = Form::new()
                .text("number", part_number.to_string())
                .text("partSize", size.to_string())
                .part("filePart", Part::stream_with_length(body, size).file_name(PART_FILE_NAME));
            self.connector.send(self.connector.request(Method::PUT, &path)?.multipart(form)).await
        })
        .await?;
        Ok(())
    }

    /// Complete a session (`POST /filebox/sessions/{id}/completed`).
    #[instrument(skip(self))]
    pub async fn complete_session(&self, session_id: Uuid) -> Result<FileRef> {
        let path = format!("{SESSIONS_PATH}/{session_id}/completed");
        let response = self.connector.post(&path).await?;
        status::json(response).await
    }

    /// Size of a stored file (`HEAD /filebox/files/{id}/content`).
    #[instrument(skip(self))]
    pub async fn get_file_size(&self, file_id: Uuid) -> Result<u64> {
        let response = self.connector.head(&content_path(file_id)).await?;
        file_size(response.headers())
    }

    /// Download the inclusive byte range `[start, end]` of a file.
    #[instrument(skip(self))]
    pub async fn download_part(
        &self,
        file_id: Uuid,
        start: u64,
        end: u64,
    ) -> Result<AsyncFileContent> {
        let cursor = RangeCursor::open(
            Arc::clone(&self.connector),
            file_id,
            RangePlan::single(),
            (start, end),
        )
        .await?;
        Ok(AsyncFileContent::new(cursor.into_stream()))
    }

    /// Download a whole file with successive 5 MiB range requests.
    #[instrument(skip(self))]
    pub async fn download(&self, file_id: Uuid) -> Result<AsyncFileContent> {
        let cursor = RangeCursor::open(
            Arc::clone(&self.connector),
            file_id,
            RangePlan::chained(),
            (0, DEFAULT_PART_SIZE),
        )
        .await?;
        Ok(AsyncFileContent::new(cursor.into_stream()))
    }
}

/// Network chunks of a ranged download over async responses.
struct RangeCursor {
    connector: Arc<Connector>,
    path: String,
    plan: RangePlan,
    response: Option<Response>,
}

impl RangeCursor {
    async fn open(
        connector: Arc<Connector>,
        file_id: Uuid,
        plan: RangePlan,
        (start, end): (u64, u64),
    ) -> Result<Self> {
        let mut cursor = Self { connector, path: content_path(file_id), plan, response: None };
        cursor.fetch(start, end).await?;
        Ok(cursor)
    }

    async fn fetch(&mut self, start: u64, end: u64) -> Result<()> {
        debug!(path = %self.path, start, end, "requesting range");
        let builder =
            self.connector.request(Method::GET, &self.path)?.header(RANGE, range_header(start, end));
        let response = self.connector.send(builder).await?;
        self.plan.record(response.status(), response.headers().get(CONTENT_RANGE))?;
        self.response = Some(response);
        Ok(())
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(response) = self.response.as_mut() {
                match response.chunk().await.map_err(|err| CloudError::from(InfraError::from(err)))? {
                    Some(chunk) if chunk.is_empty() => continue,
                    Some(chunk) => return Ok(Some(chunk)),
                    None => self.response = None,
                }
            }
            let Some((start, end)) = self.plan.next_window() else {
                return Ok(None);
            };
            self.fetch(start, end).await?;
        }
    }

    fn into_stream(self) -> futures::stream::BoxStream<'static, Result<Bytes>> {
        stream::try_unfold(self, |mut cursor| async move {
            Ok(cursor.next_chunk().await?.map(|chunk| (chunk, cursor)))
        })
        .boxed()
    }
}
