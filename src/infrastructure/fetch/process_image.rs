//! Modules already present in the running process

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::compilation::{FetchError, ModuleFetcher};
use crate::core::error::Result;
use crate::core::model::ModelType;
use crate::core::module::{ModuleId, ModuleImage, TypeSchema};

/// In-process module images.
///
/// Starts out with the runtime and host modules. Applications register the
/// modules that define their model types.
#[derive(Debug)]
pub struct ProcessImage {
    modules: RwLock<BTreeMap<ModuleId, ModuleImage>>,
}

impl ProcessImage {
    /// An image holding the runtime and host modules
    pub fn new() -> Self {
        let image = Self::empty();
        image.register_module(ModuleImage::runtime());
        image.register_module(ModuleImage::host());
        image
    }

    /// An image with no modules at all
    pub fn empty() -> Self {
        Self {
            modules: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add a module, merging its types into an existing module of the same name
    pub fn register_module(&self, image: ModuleImage) {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        match modules.get_mut(&image.name) {
            Some(existing) => existing.merge(image),
            None => {
                modules.insert(image.name.clone(), image);
            }
        }
    }

    /// Add a type schema to `module`
    pub fn register_schema<M: Into<ModuleId>>(&self, module: M, schema: TypeSchema) {
        let mut image = ModuleImage::new(module);
        image.define(schema);
        self.register_module(image);
    }

    /// Register `T` as an opaque type of the crate that defines it
    pub fn register_model<T: ?Sized>(&self) -> Result<ModelType> {
        let model = ModelType::of::<T>();
        let name = model.source_name()?;
        self.register_schema(model.module.clone(), TypeSchema::opaque(name));
        Ok(model)
    }

    pub fn contains(&self, module: &ModuleId) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(module)
    }

    /// A copy of the named module
    pub fn module(&self, module: &ModuleId) -> Option<ModuleImage> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .cloned()
    }
}

impl Default for ProcessImage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleFetcher for ProcessImage {
    async fn fetch(&self, module: &ModuleId) -> std::result::Result<Vec<u8>, FetchError> {
        let image = self
            .module(module)
            .ok_or_else(|| FetchError::NotFound(module.clone()))?;

        image
            .to_bytes()
            .map_err(|e| FetchError::InvalidRequest(format!("module '{module}' could not be encoded: {e}")))
    }
}
