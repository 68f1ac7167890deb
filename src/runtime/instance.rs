//! Renderer instances - one per render call

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value as JsonValue;

use crate::core::error::{Error, Result};
use crate::runtime::contract::{RendererContract, TemplateBase};
use crate::runtime::program::{Expr, Instruction, MODEL_ROOT, RendererType};
use crate::runtime::services::TemplateService;
use crate::runtime::value::lookup;

/// A single-use renderer executing the instructions of its [`RendererType`]
pub struct RendererInstance {
    base: TemplateBase,
    renderer: Arc<RendererType>,
    services: HashMap<String, Arc<dyn TemplateService>>,
    resolved: HashMap<String, JsonValue>,
}

impl RendererInstance {
    pub(crate) fn new(
        renderer: Arc<RendererType>,
        services: HashMap<String, Arc<dyn TemplateService>>,
    ) -> Self {
        Self {
            base: TemplateBase::new(),
            renderer,
            services,
            resolved: HashMap::new(),
        }
    }

    pub fn renderer_type(&self) -> &RendererType {
        &self.renderer
    }

    /// Value of an injected dependency, fetched once per instance
    async fn service_value(&mut self, name: &str) -> Result<&JsonValue> {
        if !self.resolved.contains_key(name) {
            let service = self
                .services
                .get(name)
                .cloned()
                .ok_or_else(|| Error::render(format!("'{name}' is not an injected dependency")))?;

            let value = service
                .value()
                .await
                .map_err(|e| Error::render(format!("service '{name}' failed: {e:#}")))?;
            self.resolved.insert(name.to_string(), value);
        }

        self.resolved
            .get(name)
            .ok_or_else(|| Error::render(format!("service '{name}' produced no value")))
    }

    fn evaluate<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, Result<JsonValue>> {
        async move {
            match expr {
                Expr::Literal(value) => Ok(value.clone()),
                Expr::Path { root, steps } if root == MODEL_ROOT => Ok(self
                    .base
                    .model()
                    .and_then(|model| lookup(model, steps))
                    .cloned()
                    .unwrap_or(JsonValue::Null)),
                Expr::Path { root, steps } => {
                    let value = self.service_value(root).await?;
                    Ok(lookup(value, steps).cloned().unwrap_or(JsonValue::Null))
                }
                Expr::Coalesce(operands) => {
                    for operand in operands {
                        let value = self.evaluate(operand).await?;
                        if !value.is_null() {
                            return Ok(value);
                        }
                    }
                    Ok(JsonValue::Null)
                }
            }
        }
        .boxed()
    }
}

#[async_trait]
impl RendererContract for RendererInstance {
    fn set_model(&mut self, model: JsonValue) {
        self.base.set_model(model);
    }

    fn write_literal(&mut self, text: &str) {
        self.base.write_literal(text);
    }

    fn write(&mut self, value: &JsonValue) {
        self.base.write(value);
    }

    async fn execute(&mut self) -> Result<()> {
        self.base.begin()?;

        let renderer = Arc::clone(&self.renderer);
        for instruction in renderer.body() {
            match instruction {
                Instruction::WriteLiteral(text) => self.write_literal(text),
                Instruction::Write(expr) => {
                    let value = self.evaluate(expr).await?;
                    self.write(&value);
                }
            }
        }

        self.base.complete();
        Ok(())
    }

    fn rendered_text(&self) -> Result<String> {
        self.base.rendered_text()
    }
}
