//! Error handling for the quill template engine.
//!
//! Every stage of the compile pipeline fails with its own variant of [`Error`],
//! so callers can tell a blank template from a broken reference module from a
//! compiler diagnostic without string matching.
//!
//! # Examples
//!
//! ```
//! use quill::core::error::{Error, Result};
//!
//! fn check(text: &str) -> Result<()> {
//!     if text.trim().is_empty() {
//!         return Err(Error::EmptyTemplate);
//!     }
//!     Ok(())
//! }
//!
//! assert!(check("  ").unwrap_err().is_validation());
//! ```

use std::fmt;

use thiserror::Error;

use crate::core::module::ModuleId;

/// Result type for quill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage that produced an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configuration,
    Parsing,
    Generation,
    ReferenceResolution,
    Compilation,
    Loading,
    Instantiation,
    Rendering,
}

/// A single message reported by a compiler backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line in the generated source, when the problem has one
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line<S: Into<String>>(line: usize, message: S) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Main error type for quill operations
#[derive(Debug, Error)]
pub enum Error {
    /// The template text is empty or whitespace only
    #[error("Template cannot be empty")]
    EmptyTemplate,

    /// The model type is parameterized (generic) or otherwise not nameable
    #[error("Unsupported model type '{model}': {reason}")]
    UnsupportedModel { model: String, reason: String },

    /// Malformed template markup
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// A required reference module could not be obtained
    #[error("Could not resolve reference module '{module}': {reason}")]
    ReferenceResolution {
        module: ModuleId,
        /// Every module still unresolved when resolution was abandoned
        unresolved: Vec<ModuleId>,
        reason: String,
    },

    /// The generated source failed to compile
    #[error("Could not compile the provided template. Errors:\n{}", join_diagnostics(.diagnostics))]
    Compilation { diagnostics: Vec<Diagnostic> },

    /// The compiled unit lacks the discoverable renderer type
    #[error("Compiled renderer type '{name}' not found: {reason}")]
    RendererTypeNotFound { name: String, reason: String },

    /// A renderer instance could not be constructed
    #[error("Could not create an instance of the compiled renderer: {0}")]
    Instantiation(String),

    /// Execution of a renderer failed or the contract was violated
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new render error
    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::Render(msg.into())
    }

    /// Create a new instantiation error
    pub fn instantiation<S: Into<String>>(msg: S) -> Self {
        Self::Instantiation(msg.into())
    }

    /// Blank templates and unsupported model types are input validation failures
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyTemplate | Self::UnsupportedModel { .. })
    }

    /// The pipeline stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Self::EmptyTemplate | Self::Parse { .. } => Stage::Parsing,
            Self::UnsupportedModel { .. } => Stage::Generation,
            Self::ReferenceResolution { .. } => Stage::ReferenceResolution,
            Self::Compilation { .. } => Stage::Compilation,
            Self::RendererTypeNotFound { .. } => Stage::Loading,
            Self::Instantiation(_) => Stage::Instantiation,
            Self::Render(_) | Self::Json(_) => Stage::Rendering,
            Self::Config(_) | Self::Io(_) => Stage::Configuration,
        }
    }
}
