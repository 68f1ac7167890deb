//! Renderer contract.
//!
//! Every generated renderer fulfills [`RendererContract`]. [`TemplateBase`]
//! is the base every renderer builds on: it owns the model slot and the
//! output buffer, and its own `execute` writes nothing.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::core::error::{Error, Result};
use crate::runtime::value::write_value;

/// Lifecycle of a renderer instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    #[default]
    Created,
    Executing,
    Completed,
}

/// The executable shape of a renderer
#[async_trait]
pub trait RendererContract: Send {
    /// Assign the model the renderer reads from
    fn set_model(&mut self, model: JsonValue);

    /// Append text verbatim
    fn write_literal(&mut self, text: &str);

    /// Append the textual form of a value
    fn write(&mut self, value: &JsonValue);

    /// Perform the renderer's writes. Runs at most once per instance.
    async fn execute(&mut self) -> Result<()>;

    /// The accumulated output; only valid once `execute` has completed
    fn rendered_text(&self) -> Result<String>;
}

/// Model slot, output buffer and execution state shared by all renderers
#[derive(Debug, Default)]
pub struct TemplateBase {
    model: Option<JsonValue>,
    output: String,
    state: ExecutionState,
}

impl TemplateBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(&self) -> Option<&JsonValue> {
        self.model.as_ref()
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Move to `Executing`; fails if the instance already ran
    pub(crate) fn begin(&mut self) -> Result<()> {
        if self.state != ExecutionState::Created {
            return Err(Error::render(
                "renderer instances are single-use; execute has already run",
            ));
        }
        self.state = ExecutionState::Executing;
        Ok(())
    }

    pub(crate) fn complete(&mut self) {
        self.state = ExecutionState::Completed;
    }
}

#[async_trait]
impl RendererContract for TemplateBase {
    fn set_model(&mut self, model: JsonValue) {
        self.model = Some(model);
    }

    fn write_literal(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn write(&mut self, value: &JsonValue) {
        write_value(&mut self.output, value);
    }

    async fn execute(&mut self) -> Result<()> {
        self.begin()?;
        self.complete();
        Ok(())
    }

    fn rendered_text(&self) -> Result<String> {
        match self.state {
            ExecutionState::Completed => Ok(self.output.clone()),
            state => Err(Error::render(format!(
                "rendered text requested before execute completed (state: {state:?})"
            ))),
        }
    }
}
