//! Template engine facade - coordinates the compile pipeline and hands out
//! renderable templates

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::compilation::{
    CodeGenerator, CompilerBackend, MarkupParser, ModuleFetcher, ReferenceResolver,
    RendererLoader,
};
use crate::core::config::EngineConfig;
use crate::core::error::{Error, Result};
use crate::core::model::ModelType;
use crate::core::module::ReferenceSet;
use crate::infrastructure::{CompositeModuleFetcher, InterpreterBackend, ProcessImage};
use crate::runtime::contract::RendererContract;
use crate::runtime::program::RendererType;
use crate::runtime::services::ServiceRegistry;

type CacheKey = (String, ModelType);

/// Compiles template text into [`Template`] handles
pub struct TemplateEngine {
    parser: MarkupParser,
    generator: CodeGenerator,
    resolver: ReferenceResolver,
    backend: Arc<dyn CompilerBackend>,
    loader: RendererLoader,
    services: Arc<ServiceRegistry>,
    backend_lock: Option<Mutex<()>>,
    cache: Option<RwLock<HashMap<CacheKey, Arc<RendererType>>>>,
}

impl TemplateEngine {
    /// Create an engine that fetches modules from `process_image` (and over
    /// HTTP when `config.base_url` is set) and compiles with the interpreter
    /// backend
    pub fn new(
        config: EngineConfig,
        process_image: Arc<ProcessImage>,
        services: ServiceRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let fetcher = CompositeModuleFetcher::from_config(process_image, &config)?;

        Self::with_components(
            config,
            Arc::new(fetcher),
            Arc::new(InterpreterBackend::new()),
            services,
        )
    }

    /// Create an engine from explicit ports
    pub fn with_components(
        config: EngineConfig,
        fetcher: Arc<dyn ModuleFetcher>,
        backend: Arc<dyn CompilerBackend>,
        services: ServiceRegistry,
    ) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            "Creating template engine (backend: {}, cache: {}, serialized: {})",
            backend.name(),
            config.cache_compiled,
            config.serialize_backend
        );

        Ok(Self {
            parser: MarkupParser::new(),
            generator: CodeGenerator::new(),
            resolver: ReferenceResolver::new(fetcher),
            backend,
            loader: RendererLoader::new(),
            services: Arc::new(services),
            backend_lock: config.serialize_backend.then(|| Mutex::new(())),
            cache: config.cache_compiled.then(|| RwLock::new(HashMap::new())),
        })
    }

    /// Compile `text` for the model type `M`
    pub async fn compile<M>(&self, text: &str) -> Result<Template<M>> {
        self.compile_as(text, ModelType::of::<M>()).await
    }

    /// Compile `text` for an explicitly described model type.
    ///
    /// The renderer is bound to `model`, not to `M`: `M` only fixes what
    /// [`Template::render`] accepts. The caller keeps the two in agreement;
    /// a model whose serialized shape lacks a member renders it as nothing.
    pub async fn compile_as<M>(&self, text: &str, model: ModelType) -> Result<Template<M>> {
        let renderer = self.compile_renderer(text, &model).await?;
        Ok(Template {
            renderer,
            services: Arc::clone(&self.services),
            model: PhantomData,
        })
    }

    /// Number of memoized renderer types; always 0 when caching is off
    pub fn cached_count(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache.read().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    async fn compile_renderer(&self, text: &str, model: &ModelType) -> Result<Arc<RendererType>> {
        let key = (text.to_string(), model.clone());
        if let Some(cached) = self.cached(&key) {
            tracing::debug!("Using cached renderer for {}", model);
            return Ok(cached);
        }

        // 1. Parse (rejects blank text and unsupported models first)
        let document = self.parser.parse(text, model)?;

        // 2. Generate renderer source
        let source = self.generator.generate(&document)?;

        // 3. Resolve reference modules
        let references = self
            .resolver
            .resolve(&ReferenceSet::for_model(model))
            .await?;

        // 4. Compile
        let unit = match &self.backend_lock {
            Some(lock) => {
                let _guard = lock.lock().await;
                self.backend.compile(&source, &references)?
            }
            None => self.backend.compile(&source, &references)?,
        };

        // 5. Load
        let renderer = Arc::new(self.loader.load(&unit, model)?);

        tracing::info!(
            "Compiled renderer {} for {} with the {} backend",
            renderer.name(),
            model,
            self.backend.name()
        );

        if let Some(cache) = &self.cache {
            cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, Arc::clone(&renderer));
        }

        Ok(renderer)
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<RendererType>> {
        self.cache.as_ref().and_then(|cache| {
            cache
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned()
        })
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("backend", &self.backend.name())
            .field("services", &self.services)
            .field("serialized", &self.backend_lock.is_some())
            .field("cached", &self.cached_count())
            .finish()
    }
}

/// A compiled template bound to the model type `M`.
///
/// Cloning is cheap; every clone renders with the same compiled renderer.
pub struct Template<M> {
    renderer: Arc<RendererType>,
    services: Arc<ServiceRegistry>,
    model: PhantomData<fn(&M)>,
}

impl<M> Template<M> {
    pub fn renderer_type(&self) -> &RendererType {
        &self.renderer
    }
}

impl<M: Serialize> Template<M> {
    /// Render `model` with a fresh renderer instance
    pub async fn render(&self, model: &M) -> Result<String> {
        let model = serde_json::to_value(model)
            .map_err(|e| Error::render(format!("model could not be serialized: {e}")))?;

        let mut instance = self.services.activate(Arc::clone(&self.renderer))?;
        instance.set_model(model);
        instance.execute().await?;
        instance.rendered_text()
    }
}

impl<M> Clone for Template<M> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            services: Arc::clone(&self.services),
            model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Template<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("renderer", &self.renderer.name())
            .field("model", &self.renderer.base().model)
            .finish()
    }
}
