use cloudsdk_common::resilience::{BackoffRange, RetryConfig, RetryExecutor};
use cloudsdk_domain::constants::{API_VERSION, API_VERSION_HEADER, CLIENT_NAME};
use cloudsdk_domain::{ClientConfig, CloudError, Result, RetrySettings};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client as ReqwestClient, Method, Request, RequestBuilder, Response};
use tracing::debug;

use super::policy::{next_attempt, HttpRetryPolicy};
use crate::errors::InfraError;

/// HTTP client with built-in retry and timeout support.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryExecutor,
}

impl HttpClient {
    /// Build a client from the SDK configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .default_headers(default_headers()?)
            .pool_max_idle_per_host(config.limits.max_idle_per_host)
            .pool_idle_timeout(config.limits.idle_timeout)
            .danger_accept_invalid_certs(!config.ssl_verify);

        if let Some(connect) = config.timeouts.connect {
            builder = builder.connect_timeout(connect);
        }
        if let Some(request) = config.timeouts.request {
            builder = builder.timeout(request);
        }
        if !config.trust_env {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|err| CloudError::from(InfraError::from(err)))?;
        Ok(Self { client, retry: RetryExecutor::new(retry_config(&config.retry)?) })
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Execute a prepared request with retry semantics.
    ///
    /// Replayable requests are cloned for every attempt; a streaming body is
    /// sent once.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let policy = HttpRetryPolicy::for_request(&request);
        let client = &self.client;
        let mut pending = Some(request);

        self.retry
            .execute(&policy, || {
                let attempt = next_attempt(&mut pending);
                async move {
                    let request = attempt.ok_or_else(body_spent)?;
                    let (method, url) = (request.method().clone(), request.url().clone());
                    debug!(%method, %url, "sending HTTP request");

                    let response = client
                        .execute(request)
                        .await
                        .map_err(|err| CloudError::from(InfraError::from(err)))?;
                    debug!(%method, %url, status = %response.status(), "received HTTP response");
                    Ok(response)
                }
            })
            .await
    }
}

/// Headers every request carries.
pub(crate) fn default_headers() -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let agent = format!("{CLIENT_NAME}/v{}", env!("CARGO_PKG_VERSION"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&agent)
            .map_err(|err| CloudError::Config(format!("invalid user agent: {err}")))?,
    );
    let version = HeaderName::from_bytes(API_VERSION_HEADER.as_bytes())
        .map_err(|err| CloudError::Config(format!("invalid header name: {err}")))?;
    headers.insert(version, HeaderValue::from_static(API_VERSION));
    Ok(headers)
}

pub(crate) fn retry_config(settings: &RetrySettings) -> Result<RetryConfig> {
    let backoff = BackoffRange::new(settings.backoff_min, settings.backoff_max)
        .map_err(|err| CloudError::Config(err.to_string()))?;
    Ok(RetryConfig::new(settings.attempts, backoff))
}

pub(crate) fn body_spent() -> CloudError {
    CloudError::Connection("request body was already sent and cannot be replayed".into())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use reqwest::StatusCode;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(attempts: u32) -> ClientConfig {
        let mut config = ClientConfig::new("key");
        config.trust_env = false;
        config.retry = RetrySettings {
            attempts,
            backoff_min: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
        };
        config
    }

    fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn sends_default_headers_once() {
        let server = MockServer::start().await;
        let agent = format!("cloudsdk-client/v{}", env!("CARGO_PKG_VERSION"));
        Mock::given(method("GET"))
            .and(header("user-agent", agent.as_str()))
            .and(header("x-api-version", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::from_config(&config(3)).unwrap();
        let request = client.request(Method::GET, server.uri()).build().unwrap();
        let response = client.send(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::from_config(&config(3)).unwrap();
        let request = client.request(Method::GET, server.uri()).build().unwrap();
        let response = client.send(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn retries_on_network_failure_then_gives_up() {
        let client = HttpClient::from_config(&config(2)).unwrap();
        let request = client.request(Method::GET, refused_url()).build().unwrap();

        match client.send(request).await {
            Err(CloudError::Connection(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn inverted_backoff_is_a_config_error() {
        let mut config = config(3);
        config.retry.backoff_min = Duration::from_secs(5);
        assert!(matches!(HttpClient::from_config(&config), Err(CloudError::Config(_))));
    }
}
