//! Compile pipeline stages.
//!
//! Template text flows through the stages in this order:
//!
//! 1. [`MarkupParser`] splits the text into an [`IntermediateDocument`]
//! 2. [`CodeGenerator`] emits the renderer's [`GeneratedSource`]
//! 3. [`ReferenceResolver`] fetches every reference module through a [`ModuleFetcher`]
//! 4. a [`CompilerBackend`] compiles the source into a [`CompiledUnit`](crate::runtime::CompiledUnit)
//! 5. [`RendererLoader`] decodes the unit and returns its [`RendererType`](crate::runtime::RendererType)

pub mod codegen;
pub mod document;
pub mod errors;
pub mod loader;
pub mod parser;
pub mod references;
pub mod traits;

pub use codegen::{CodeGenerator, GENERATED_UNIT, GeneratedSource, RENDERER_TYPE_NAME};
pub use document::{Directive, IntermediateDocument, Segment};
pub use errors::FetchError;
pub use loader::RendererLoader;
pub use parser::MarkupParser;
pub use references::ReferenceResolver;
pub use traits::{CompilerBackend, ModuleFetcher};
