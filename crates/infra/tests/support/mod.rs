//! Shared fixtures for the wiremock-backed integration tests.

use std::time::Duration;

use cloudsdk_domain::constants::{API_KEY_HEADER, AUTH_TOKEN_PATH};
use cloudsdk_domain::ClientConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Route SDK logs to the test output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const API_KEY: &str = "test-api-key";
pub const FRESH: &str = "Bearer fresh";

/// Client configuration pointing at `server`, with millisecond backoff.
pub fn config(server: &MockServer) -> ClientConfig {
    init_tracing();
    let mut config = ClientConfig::new(API_KEY).with_api_url(server.uri());
    config.retry.backoff_min = Duration::from_millis(1);
    config.retry.backoff_max = Duration::from_millis(5);
    config
}

/// Token endpoint issuing [`FRESH`], expected to be hit `times` times.
pub async fn mount_token(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(AUTH_TOKEN_PATH))
        .and(header(API_KEY_HEADER, API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": "fresh",
            "tokenType": "Bearer",
            "expiresIn": 3600
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Whether `needle` occurs anywhere in `haystack`.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Multipart encoding of a text field as reqwest writes it.
pub fn text_field(name: &str, value: &str) -> Vec<u8> {
    format!("form-data; name=\"{name}\"\r\n\r\n{value}\r\n").into_bytes()
}

/// Requests the server received for `route`.
pub async fn received(server: &MockServer, verb: &str, route: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == verb && request.url.path() == route)
        .collect()
}
