use cloudsdk_domain::{ClientConfig, CloudError, Result};
use reqwest::header::IF_MATCH;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use tracing::instrument;
use url::Url;

use super::{base_url, join};
use crate::auth::ApiKeyAuth;
use crate::http::{status, HttpClient};

/// Authenticated connector for the tokio execution model.
#[derive(Debug)]
pub struct Connector {
    base_url: Url,
    http: HttpClient,
    auth: ApiKeyAuth,
}

impl Connector {
    /// Create a connector with its own transport and credential cache.
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Config` when the configuration is invalid.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let base_url = base_url(&config.api_url)?;
        let http = HttpClient::from_config(config)?;
        let auth = ApiKeyAuth::new(config.api_key.clone(), &base_url)?;
        Ok(Self { base_url, http, auth })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &ApiKeyAuth {
        &self.auth
    }

    /// Start a request for a path relative to the API URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, join(&self.base_url, path)?))
    }

    /// Send a request built with [`Connector::request`].
    ///
    /// Non-success statuses come back as errors, after the body was read.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|err| CloudError::Config(err.to_string()))?;
        let response = self.auth.send(&self.http, request).await?;
        status::check(response).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::GET, path)?).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn head(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::HEAD, path)?).await
    }

    /// POST without a body.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn post(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::POST, path)?).await
    }

    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    /// PUT a JSON body, conditional on `tag` when given.
    #[instrument(skip(self, body), fields(path = %path, tag = ?tag))]
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        tag: Option<&str>,
    ) -> Result<Response> {
        let mut builder = self.request(Method::PUT, path)?.json(body);
        if let Some(tag) = tag {
            builder = builder.header(IF_MATCH, tag);
        }
        self.send(builder).await
    }

    /// PATCH a JSON body; updates are always conditional on `tag`.
    #[instrument(skip(self, body), fields(path = %path, tag = %tag))]
    pub async fn patch_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        tag: &str,
    ) -> Result<Response> {
        let builder = self.request(Method::PATCH, path)?.json(body).header(IF_MATCH, tag);
        self.send(builder).await
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::DELETE, path)?).await
    }
}
