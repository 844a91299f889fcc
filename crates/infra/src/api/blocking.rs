use cloudsdk_domain::{ClientConfig, CloudError, Result};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::IF_MATCH;
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;
use url::Url;

use super::{base_url, join};
use crate::auth::BlockingApiKeyAuth;
use crate::http::{status, BlockingHttpClient};

/// Authenticated connector for the threaded execution model.
///
/// Same surface as [`Connector`](super::Connector) with blocking calls.
#[derive(Debug)]
pub struct BlockingConnector {
    base_url: Url,
    http: BlockingHttpClient,
    auth: BlockingApiKeyAuth,
}

impl BlockingConnector {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let base_url = base_url(&config.api_url)?;
        let http = BlockingHttpClient::from_config(config)?;
        let auth = BlockingApiKeyAuth::new(config.api_key.clone(), &base_url)?;
        Ok(Self { base_url, http, auth })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &BlockingApiKeyAuth {
        &self.auth
    }

    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, join(&self.base_url, path)?))
    }

    pub fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|err| CloudError::Config(err.to_string()))?;
        let response = self.auth.send(&self.http, request)?;
        status::check_blocking(response)
    }

    #[instrument(skip(self), fields(path = %path))]
    pub fn get(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::GET, path)?)
    }

    #[instrument(skip(self), fields(path = %path))]
    pub fn head(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::HEAD, path)?)
    }

    #[instrument(skip(self), fields(path = %path))]
    pub fn post(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::POST, path)?)
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.request(Method::POST, path)?.json(body))
    }

    #[instrument(skip(self, body), fields(path = %path, tag = ?tag))]
    pub fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        tag: Option<&str>,
    ) -> Result<Response> {
        let mut builder = self.request(Method::PUT, path)?.json(body);
        if let Some(tag) = tag {
            builder = builder.header(IF_MATCH, tag);
        }
        self.send(builder)
    }

    #[instrument(skip(self, body), fields(path = %path, tag = %tag))]
    pub fn patch_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        tag: &str,
    ) -> Result<Response> {
        self.send(self.request(Method::PATCH, path)?.json(body).header(IF_MATCH, tag))
    }

    #[instrument(skip(self), fields(path = %path))]
    pub fn delete(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::DELETE, path)?)
    }
}
