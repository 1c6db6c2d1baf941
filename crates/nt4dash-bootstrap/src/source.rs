//! [`ModuleSource`] implementations.

use async_trait::async_trait;
use nt4dash_server::BINARY_MODULE;
use nt4dash_types::DashError;
use tracing::debug;

use crate::module::ModuleSource;

/// Fetches the module from a running dashboard server.
pub struct HttpModuleSource {
    base_url: String,
    module_name: String,
    client: reqwest::Client,
}

impl HttpModuleSource {
    /// `base_url` is the dashboard origin, e.g. `"http://10.0.0.2:7070"`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            module_name: BINARY_MODULE.name.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch a differently named module.
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.module_name.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ModuleSource for HttpModuleSource {
    async fn fetch(&self) -> Result<Vec<u8>, DashError> {
        let url = self.url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DashError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::Fetch(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DashError::Fetch(format!("{url}: {e}")))?;
        debug!(url = %url, len = bytes.len(), "fetched binary module");
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.url()
    }
}

/// Serves a module already in memory, by default the one embedded in the
/// server.
#[derive(Debug, Clone)]
pub struct StaticModuleSource {
    bytes: Vec<u8>,
}

impl StaticModuleSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl Default for StaticModuleSource {
    fn default() -> Self {
        Self::new(BINARY_MODULE.bytes)
    }
}

#[async_trait]
impl ModuleSource for StaticModuleSource {
    async fn fetch(&self) -> Result<Vec<u8>, DashError> {
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        format!("<embedded {} bytes>", self.bytes.len())
    }
}
