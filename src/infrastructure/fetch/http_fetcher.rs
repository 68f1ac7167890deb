//! HTTP-based reference module fetcher

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::compilation::{FetchError, ModuleFetcher};
use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};
use crate::core::module::ModuleId;

const MODULE_PATH: &str = "_framework/_bin/";

/// Fetches module binaries from `<base>/_framework/_bin/<module>`
#[derive(Debug, Clone)]
pub struct HttpModuleFetcher {
    client: Client,
    base_url: Url,
}

impl HttpModuleFetcher {
    pub fn new(base_url: Url, config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    /// Location of a module; the identifier is form-url-encoded
    pub fn module_url(&self, module: &ModuleId) -> std::result::Result<Url, FetchError> {
        let encoded: String =
            url::form_urlencoded::byte_serialize(module.as_str().as_bytes()).collect();

        self.base_url
            .join(&format!("{MODULE_PATH}{encoded}"))
            .map_err(|e| FetchError::InvalidRequest(format!("module '{module}': {e}")))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl ModuleFetcher for HttpModuleFetcher {
    async fn fetch(&self, module: &ModuleId) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.module_url(module)?;
        tracing::debug!("Fetching reference module {} from {}", module, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("Failed to read response body: {e}"),
        })?;

        Ok(bytes.to_vec())
    }
}
