//! Runtime side of the engine: the renderer contract, loaded renderer types,
//! instances and the services they are constructed with.

pub mod contract;
pub mod instance;
pub mod program;
pub mod services;
pub mod value;

pub use contract::{ExecutionState, RendererContract, TemplateBase};
pub use instance::RendererInstance;
pub use program::{CompiledUnit, RendererType};
pub use services::{ServiceRegistry, StaticService, TemplateService};
