//! quill - compile text templates bound to a model type at runtime.
//!
//! A template is plain text with embedded `@` expressions. Compiling it for a
//! model type runs a short pipeline: the markup is parsed, renderer source is
//! generated, the modules the source refers to are resolved, and a compiler
//! backend turns the source into a unit the loader hands back as a renderer
//! type. The resulting [`Template`] renders any number of models.
//!
//! ```
//! use std::sync::Arc;
//!
//! use quill::{EngineConfig, ProcessImage, ServiceRegistry, TemplateEngine};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Person {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> quill::Result<()> {
//!     let image = Arc::new(ProcessImage::new());
//!     image.register_model::<Person>()?;
//!
//!     let engine = TemplateEngine::new(EngineConfig::default(), image, ServiceRegistry::new())?;
//!     let template = engine.compile::<Person>("Hello @Model.Name!").await?;
//!
//!     let text = template.render(&Person { name: "Ada".into() }).await?;
//!     assert_eq!(text, "Hello Ada!");
//!     Ok(())
//! }
//! ```
#![deny(unsafe_code)]

pub mod compilation;
pub mod core;
pub mod engine;
pub mod infrastructure;
pub mod runtime;

pub use crate::core::{
    Diagnostic, EngineConfig, Error, ModelType, Result, Stage,
    module::{ModuleId, ModuleImage, TypeSchema},
};
pub use engine::{Template, TemplateEngine};
pub use infrastructure::{HttpModuleFetcher, InterpreterBackend, ProcessImage};
pub use runtime::{ServiceRegistry, StaticService, TemplateService};
