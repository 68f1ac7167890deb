//! Compiled unit format.
//!
//! A compiler backend encodes a [`UnitImage`] into the bytes of a
//! [`CompiledUnit`]; the loader decodes it and hands out the renderer it
//! finds as a [`RendererType`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::error::Result;

/// Expression root naming the model
pub const MODEL_ROOT: &str = "Model";

/// One step of a member path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathStep {
    Member(String),
    Index(usize),
    Key(String),
}

/// A compiled expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// `root.step.step`; the root is `Model` or an injected dependency
    Path { root: String, steps: Vec<PathStep> },
    Literal(JsonValue),
    /// First non-null operand
    Coalesce(Vec<Expr>),
}

/// A single renderer operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    WriteLiteral(String),
    Write(Expr),
}

/// The contract a renderer type implements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRef {
    pub name: String,
    pub model: String,
}

/// A type defined by a compiled unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeImage {
    pub name: String,
    pub base: ContractRef,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub body: Vec<Instruction>,
}

/// Decoded content of a compiled unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitImage {
    pub name: String,
    pub types: Vec<TypeImage>,
}

/// In-memory output of a successful compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    bytes: Vec<u8>,
}

impl CompiledUnit {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_image(image: &UnitImage) -> Result<Self> {
        Ok(Self::new(serde_json::to_vec(image)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A loaded renderer type, ready to be instantiated
#[derive(Debug, Clone, PartialEq)]
pub struct RendererType {
    name: String,
    unit: String,
    base: ContractRef,
    dependencies: Vec<String>,
    body: Vec<Instruction>,
}

impl RendererType {
    pub(crate) fn from_image(unit: &str, image: TypeImage) -> Self {
        Self {
            name: image.name,
            unit: unit.to_string(),
            base: image.base,
            dependencies: image.dependencies,
            body: image.body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the unit the type was loaded from
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn base(&self) -> &ContractRef {
        &self.base
    }

    /// Constructor dependencies, in declaration order
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn body(&self) -> &[Instruction] {
        &self.body
    }
}
