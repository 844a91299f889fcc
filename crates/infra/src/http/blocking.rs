//! Thread-blocking twin of [`HttpClient`](super::HttpClient).
//!
//! Must not be created or dropped inside an async context; `reqwest` runs
//! its own runtime behind the blocking API.

use cloudsdk_common::resilience::RetryExecutor;
use cloudsdk_domain::{ClientConfig, CloudError, Result};
use reqwest::blocking::{Client as ReqwestClient, Request, RequestBuilder, Response};
use reqwest::Method;
use tracing::debug;

use super::client::{body_spent, default_headers, retry_config};
use super::policy::{next_attempt, HttpRetryPolicy};
use crate::errors::InfraError;

#[derive(Debug, Clone)]
pub struct BlockingHttpClient {
    client: ReqwestClient,
    retry: RetryExecutor,
}

impl BlockingHttpClient {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .default_headers(default_headers()?)
            .pool_max_idle_per_host(config.limits.max_idle_per_host)
            .pool_idle_timeout(config.limits.idle_timeout)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .connect_timeout(config.timeouts.connect)
            .timeout(config.timeouts.request);

        if !config.trust_env {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|err| CloudError::from(InfraError::from(err)))?;
        Ok(Self { client, retry: RetryExecutor::new(retry_config(&config.retry)?) })
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Execute a prepared request, retrying replayable ones.
    pub fn send(&self, request: Request) -> Result<Response> {
        let policy = HttpRetryPolicy::for_blocking_request(&request);
        let mut pending = Some(request);

        self.retry.execute_blocking(&policy, || {
            let attempt = next_attempt(&mut pending);
            let request = attempt.ok_or_else(body_spent)?;
            let (method, url) = (request.method().clone(), request.url().clone());
            debug!(%method, %url, "sending HTTP request");

            let response = self
                .client
                .execute(request)
                .map_err(|err| CloudError::from(InfraError::from(err)))?;
            debug!(%method, %url, status = %response.status(), "received HTTP response");
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use cloudsdk_domain::RetrySettings;
    use reqwest::StatusCode;
    use wiremock::matchers::method;
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

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_send_returns_response() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let status = tokio::task::spawn_blocking(move || {
            let client = BlockingHttpClient::from_config(&config(3)).unwrap();
            let request = client.request(Method::DELETE, uri).build().unwrap();
            client.send(request).map(|response| response.status())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn blocking_retries_refused_connections_up_to_the_budget() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BlockingHttpClient::from_config(&config(3)).unwrap();
        let request = client.request(Method::GET, format!("http://{addr}")).build().unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let policy = HttpRetryPolicy::for_blocking_request(&request);
        let result: Result<()> = client.retry().execute_blocking(&policy, || {
            counter.fetch_add(1, Ordering::SeqCst);
            let copy = request.try_clone().ok_or_else(body_spent)?;
            client.client.execute(copy).map(|_| ()).map_err(|e| InfraError::from(e).into())
        });

        assert!(matches!(result, Err(CloudError::Connection(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
