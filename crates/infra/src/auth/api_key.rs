//! Bearer credentials obtained with an API key.

use cloudsdk_common::auth::{AsyncRefreshGate, RefreshGate};
use cloudsdk_domain::constants::{API_KEY_HEADER, AUTH_TOKEN_PATH};
use cloudsdk_domain::{CloudError, ErrorView, Result, TokenView};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use tracing::{info, instrument};
use url::Url;

use crate::http::policy::next_attempt;
use crate::http::{status, BlockingHttpClient, HttpClient};

/// Credential state shared by both execution models.
#[derive(Debug, Clone)]
struct ApiKey {
    key: String,
    token_url: Url,
}

impl ApiKey {
    fn new(key: impl Into<String>, api_url: &Url) -> Result<Self> {
        let token_url = api_url
            .join(AUTH_TOKEN_PATH)
            .map_err(|err| CloudError::Config(format!("invalid token url: {err}")))?;
        Ok(Self { key: key.into(), token_url })
    }
}

fn authorization(credential: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(credential).map_err(|_| {
        CloudError::InvalidResponse("issued credential is not a valid header value".into())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn not_replayable() -> CloudError {
    CloudError::Unauthorized(ErrorView::message(
        "request body cannot be replayed after credential refresh",
    ))
}

/// API-key authentication for [`HttpClient`].
#[derive(Debug)]
pub struct ApiKeyAuth {
    api_key: ApiKey,
    gate: AsyncRefreshGate,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>, api_url: &Url) -> Result<Self> {
        Ok(Self { api_key: ApiKey::new(api_key, api_url)?, gate: AsyncRefreshGate::new() })
    }

    pub fn gate(&self) -> &AsyncRefreshGate {
        &self.gate
    }

    /// Exchange the API key for a credential string.
    ///
    /// # Errors
    ///
    /// Returns the mapped status error when the token endpoint refuses the
    /// key, or a transport error.
    #[instrument(skip_all, fields(url = %self.api_key.token_url))]
    pub async fn fetch_token(&self, http: &HttpClient) -> Result<String> {
        let request = http
            .request(Method::GET, self.api_key.token_url.clone())
            .header(API_KEY_HEADER, &self.api_key.key)
            .build()
            .map_err(|err| CloudError::Config(err.to_string()))?;

        let response = status::check(http.send(request).await?).await?;
        let token: TokenView = status::json(response).await?;
        info!(token_type = %token.token_type, expires_in = ?token.expires_in, "obtained access token");
        Ok(token.credential())
    }

    /// Send `request` with the cached credential, refreshing it once if the
    /// server answers 401.
    pub async fn send(&self, http: &HttpClient, request: reqwest::Request) -> Result<reqwest::Response> {
        let mut slot = Some(request);
        self.gate
            .run(
                |credential| {
                    let attempt = next_attempt(&mut slot);
                    async move {
                        let mut request = attempt.ok_or_else(not_replayable)?;
                        request.headers_mut().insert(AUTHORIZATION, authorization(&credential)?);
                        http.send(request).await
                    }
                },
                |response| response.status() == StatusCode::UNAUTHORIZED,
                || self.fetch_token(http),
            )
            .await
    }
}

/// API-key authentication for [`BlockingHttpClient`].
#[derive(Debug)]
pub struct BlockingApiKeyAuth {
    api_key: ApiKey,
    gate: RefreshGate,
}

impl BlockingApiKeyAuth {
    pub fn new(api_key: impl Into<String>, api_url: &Url) -> Result<Self> {
        Ok(Self { api_key: ApiKey::new(api_key, api_url)?, gate: RefreshGate::new() })
    }

    pub fn gate(&self) -> &RefreshGate {
        &self.gate
    }

    #[instrument(skip_all, fields(url = %self.api_key.token_url))]
    pub fn fetch_token(&self, http: &BlockingHttpClient) -> Result<String> {
        let request = http
            .request(Method::GET, self.api_key.token_url.clone())
            .header(API_KEY_HEADER, &self.api_key.key)
            .build()
            .map_err(|err| CloudError::Config(err.to_string()))?;

        let response = status::check_blocking(http.send(request)?)?;
        let token: TokenView = status::json_blocking(response)?;
        info!(token_type = %token.token_type, expires_in = ?token.expires_in, "obtained access token");
        Ok(token.credential())
    }

    pub fn send(
        &self,
        http: &BlockingHttpClient,
        request: reqwest::blocking::Request,
    ) -> Result<reqwest::blocking::Response> {
        let mut slot = Some(request);
        self.gate.run(
            |credential| {
                let mut request = next_attempt(&mut slot).ok_or_else(not_replayable)?;
                request.headers_mut().insert(AUTHORIZATION, authorization(&credential)?);
                http.send(request)
            },
            |response| response.status() == StatusCode::UNAUTHORIZED,
            || self.fetch_token(http),
        )
    }
}
