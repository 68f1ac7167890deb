//! Compiler backends

pub mod expression;
mod interpreter;

pub use expression::parse_expression;
pub use interpreter::InterpreterBackend;
