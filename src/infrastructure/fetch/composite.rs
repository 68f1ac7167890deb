//! Composite module fetcher that prefers modules already in the process

use std::sync::Arc;

use async_trait::async_trait;

use super::{HttpModuleFetcher, ProcessImage};
use crate::compilation::{FetchError, ModuleFetcher};
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::module::ModuleId;

/// Looks in the process image first, then over HTTP when a base URL is configured
pub struct CompositeModuleFetcher {
    local: Arc<ProcessImage>,
    remote: Option<HttpModuleFetcher>,
}

impl CompositeModuleFetcher {
    pub fn new(local: Arc<ProcessImage>, remote: Option<HttpModuleFetcher>) -> Self {
        Self { local, remote }
    }

    /// Build from configuration; HTTP is only used when `base_url` is set
    pub fn from_config(local: Arc<ProcessImage>, config: &EngineConfig) -> Result<Self> {
        let remote = config
            .base_url
            .clone()
            .map(|base_url| HttpModuleFetcher::new(base_url, config))
            .transpose()?;

        Ok(Self::new(local, remote))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

#[async_trait]
impl ModuleFetcher for CompositeModuleFetcher {
    async fn fetch(&self, module: &ModuleId) -> std::result::Result<Vec<u8>, FetchError> {
        match (self.local.fetch(module).await, &self.remote) {
            (Err(FetchError::NotFound(_)), Some(remote)) => {
                tracing::debug!("CompositeModuleFetcher: {} not loaded locally, using HTTP", module);
                remote.fetch(module).await
            }
            (result, _) => result,
        }
    }
}
