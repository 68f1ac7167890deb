//! Reference resolver - fetches every module a compilation needs, all at
//! once, and only succeeds when every one of them arrived.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::compilation::traits::ModuleFetcher;
use crate::core::error::{Error, Result};
use crate::core::module::{ReferenceSet, ResolvedReferences};

/// Resolves a [`ReferenceSet`] through a [`ModuleFetcher`]
#[derive(Clone)]
pub struct ReferenceResolver {
    fetcher: Arc<dyn ModuleFetcher>,
}

impl ReferenceResolver {
    pub fn new(fetcher: Arc<dyn ModuleFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch every module concurrently.
    ///
    /// The first failure ends resolution; fetches still in flight are dropped
    /// and nothing that was already fetched is returned.
    pub async fn resolve(&self, references: &ReferenceSet) -> Result<ResolvedReferences> {
        let fetcher = &self.fetcher;
        let mut pending: FuturesUnordered<_> = references
            .iter()
            .map(|module| async move { (module, fetcher.fetch(module).await) })
            .collect();

        let mut resolved = BTreeMap::new();

        while let Some((module, result)) = pending.next().await {
            match result {
                Ok(bytes) => {
                    tracing::debug!("Resolved reference module {} ({} bytes)", module, bytes.len());
                    resolved.insert(module.clone(), bytes);
                }
                Err(e) => {
                    let unresolved: Vec<_> = references
                        .iter()
                        .filter(|m| !resolved.contains_key(*m))
                        .cloned()
                        .collect();

                    tracing::warn!(
                        "Reference module {} could not be resolved: {}; {} module(s) left unresolved",
                        module,
                        e,
                        unresolved.len()
                    );

                    return Err(Error::ReferenceResolution {
                        module: module.clone(),
                        unresolved,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(ResolvedReferences::from_map(resolved))
    }
}
