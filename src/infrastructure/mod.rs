//! Infrastructure layer - concrete implementations of compilation ports

pub mod compiler;
pub mod fetch;

pub use compiler::InterpreterBackend;
pub use fetch::{CompositeModuleFetcher, HttpModuleFetcher, ProcessImage};
