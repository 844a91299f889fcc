//! API connector
//!
//! Every SDK request goes through a connector: it resolves paths against the
//! configured API URL, attaches the bearer credential through the refresh
//! gate, retries transport failures of idempotent requests and maps
//! non-success statuses to [`CloudError`].
//!
//! [`Connector`] serves the tokio model and [`BlockingConnector`] the
//! threaded one.

pub mod blocking;
pub mod connector;

pub use blocking::BlockingConnector;
pub use connector::Connector;

use cloudsdk_domain::{CloudError, Result};
use url::Url;

/// Parse the API URL so relative paths resolve below it.
pub(crate) fn base_url(api_url: &str) -> Result<Url> {
    let mut url = Url::parse(api_url.trim())
        .map_err(|err| CloudError::Config(format!("invalid api url {api_url:?}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(CloudError::Config(format!("api url {api_url:?} cannot be a base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|err| CloudError::Config(format!("invalid request path {path:?}: {err}")))
}
