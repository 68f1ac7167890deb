//! Service activation.
//!
//! A renderer declares its constructor dependencies by name (`@inject Clock`).
//! The [`ServiceRegistry`] supplies them when an instance is created; a
//! dependency with no registered service makes activation fail.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::core::error::{Error, Result};
use crate::runtime::instance::RendererInstance;
use crate::runtime::program::RendererType;

/// A dependency a renderer can read values from
#[async_trait]
pub trait TemplateService: Send + Sync {
    /// Current value exposed to templates
    async fn value(&self) -> anyhow::Result<JsonValue>;
}

/// A service exposing a fixed value
#[derive(Debug, Clone)]
pub struct StaticService(JsonValue);

impl StaticService {
    pub fn new(value: JsonValue) -> Self {
        Self(value)
    }
}

#[async_trait]
impl TemplateService for StaticService {
    async fn value(&self) -> anyhow::Result<JsonValue> {
        Ok(self.0.clone())
    }
}

/// Named services available to renderer constructors
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn TemplateService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under a dependency name, replacing any previous one
    pub fn register<S: Into<String>>(&mut self, name: S, service: Arc<dyn TemplateService>) {
        self.services.insert(name.into(), service);
    }

    /// Register a fixed value under a dependency name
    pub fn register_value<S: Into<String>>(&mut self, name: S, value: JsonValue) {
        self.register(name, Arc::new(StaticService::new(value)));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TemplateService>> {
        self.services.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered dependency names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct a renderer instance, resolving every declared dependency
    pub fn activate(&self, renderer: Arc<RendererType>) -> Result<RendererInstance> {
        let missing: Vec<&str> = renderer
            .dependencies()
            .iter()
            .map(String::as_str)
            .filter(|name| !self.contains(name))
            .collect();

        if !missing.is_empty() {
            return Err(Error::instantiation(format!(
                "no service registered for dependencies of '{}': {}",
                renderer.name(),
                missing.join(", ")
            )));
        }

        let services = renderer
            .dependencies()
            .iter()
            .filter_map(|name| self.get(name).map(|service| (name.clone(), service)))
            .collect();

        Ok(RendererInstance::new(renderer, services))
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}
