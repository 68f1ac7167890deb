//! Core types shared by every stage of the pipeline

pub mod config;
pub mod error;
pub mod model;
pub mod module;

pub use config::EngineConfig;
pub use error::{Diagnostic, Error, Result, Stage};
pub use model::ModelType;
pub use module::{
    BASE_CONTRACT, HOST_MODULE, ModuleId, ModuleImage, RUNTIME_MODULE, ReferenceSet,
    ResolvedReferences, TypeSchema,
};
