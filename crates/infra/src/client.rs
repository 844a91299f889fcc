//! SDK entry points.
//!
//! Each client owns its connector and with it the credential cache and the
//! retry executor. Clients are cheap to clone; clones share that state.

use std::sync::Arc;

use cloudsdk_domain::{ClientConfig, Result};
use tracing::info;

use crate::api::{BlockingConnector, Connector};
use crate::files::{FilesApi, FilesAsyncApi};

/// Client for the threaded execution model.
///
/// Must not be created or dropped inside an async runtime.
#[derive(Debug, Clone)]
pub struct Client {
    connector: Arc<BlockingConnector>,
}

impl Client {
    /// # Errors
    ///
    /// `Config` when the configuration is invalid or the transport cannot be
    /// built from it.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let connector = BlockingConnector::new(config)?;
        info!(api_url = %connector.base_url(), "client ready");
        Ok(Self { connector: Arc::new(connector) })
    }

    pub fn connector(&self) -> &BlockingConnector {
        &self.connector
    }

    pub fn files(&self) -> FilesApi {
        FilesApi::new(Arc::clone(&self.connector))
    }
}

/// Client for the tokio execution model.
#[derive(Debug, Clone)]
pub struct AsyncClient {
    connector: Arc<Connector>,
}

impl AsyncClient {
    /// # Errors
    ///
    /// `Config` when the configuration is invalid or the transport cannot be
    /// built from it.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let connector = Connector::new(config)?;
        info!(api_url = %connector.base_url(), "async client ready");
        Ok(Self { connector: Arc::new(connector) })
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn files(&self) -> FilesAsyncApi {
        FilesAsyncApi::new(Arc::clone(&self.connector))
    }
}
