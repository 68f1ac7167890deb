//! Loader - decodes a compiled unit and hands back its renderer type

use crate::compilation::codegen::RENDERER_TYPE_NAME;
use crate::core::error::{Error, Result};
use crate::core::model::ModelType;
use crate::core::module::BASE_CONTRACT;
use crate::runtime::program::{CompiledUnit, RendererType, UnitImage};

/// Loads compiled units
#[derive(Debug, Default, Clone, Copy)]
pub struct RendererLoader;

impl RendererLoader {
    pub fn new() -> Self {
        Self
    }

    /// Decode `unit` and return the renderer bound to `model`
    pub fn load(&self, unit: &CompiledUnit, model: &ModelType) -> Result<RendererType> {
        let not_found = |reason: String| Error::RendererTypeNotFound {
            name: RENDERER_TYPE_NAME.to_string(),
            reason,
        };

        let image: UnitImage = serde_json::from_slice(unit.as_bytes())
            .map_err(|e| not_found(format!("compiled unit could not be loaded: {e}")))?;

        let model_name = model.source_name()?;
        let unit_name = image.name;

        let type_image = image
            .types
            .into_iter()
            .find(|t| {
                t.name == RENDERER_TYPE_NAME
                    && t.base.name == BASE_CONTRACT
                    && t.base.model == model_name
            })
            .ok_or_else(|| {
                not_found(format!(
                    "unit '{unit_name}' has no type implementing {BASE_CONTRACT}<{model_name}>"
                ))
            })?;

        tracing::debug!(
            "Loaded renderer {} from unit {} ({} instructions)",
            type_image.name,
            unit_name,
            type_image.body.len()
        );

        Ok(RendererType::from_image(&unit_name, type_image))
    }
}
