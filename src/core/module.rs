//! Reference modules.
//!
//! A compilation needs the binary content of every module its generated
//! source refers to: the runtime, the hosting module that defines the
//! renderer contract, and the module that defines the model type. The content
//! of a module is a [`ModuleImage`]: the list of types it exports.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::model::ModelType;

/// Module providing the primitive types
pub const RUNTIME_MODULE: &str = "quill.runtime";

/// Module defining the renderer contract
pub const HOST_MODULE: &str = "quill";

/// Qualified name of the renderer base contract
pub const BASE_CONTRACT: &str = "quill.templating.TemplateBase";

/// Scalar type names exported by the runtime module; they have no members
pub const SCALAR_TYPES: [&str; 4] = ["string", "int", "float", "bool"];

/// The runtime's dynamic type; any member access is accepted
pub const OBJECT_TYPE: &str = "object";

/// Identifier of a reference module
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A type exported by a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Dotted qualified name
    pub name: String,
    /// Member name to member type name; `None` for opaque types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<BTreeMap<String, String>>,
}

impl TypeSchema {
    /// A type whose members are not described
    pub fn opaque<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            members: None,
        }
    }

    /// A type with an explicit member list
    pub fn with_members<S, I, K, V>(name: S, members: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            members: Some(
                members
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Look up a member type: exact match first, then ASCII case-insensitive.
    ///
    /// `Some(None)` means the type is opaque and any member is accepted.
    pub fn member(&self, name: &str) -> Option<Option<&str>> {
        let Some(members) = &self.members else {
            return Some(None);
        };

        members
            .get(name)
            .or_else(|| {
                members
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(|ty| Some(ty.as_str()))
    }
}

/// Binary content of a reference module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleImage {
    pub name: ModuleId,
    #[serde(default)]
    pub types: Vec<TypeSchema>,
}

impl ModuleImage {
    pub fn new<M: Into<ModuleId>>(name: M) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// The runtime module with its primitive types
    pub fn runtime() -> Self {
        let mut image = Self::new(RUNTIME_MODULE);
        for scalar in SCALAR_TYPES {
            image.define(TypeSchema::with_members(
                scalar,
                std::iter::empty::<(String, String)>(),
            ));
        }
        image.define(TypeSchema::opaque(OBJECT_TYPE));
        image
    }

    /// The hosting module defining the renderer contract
    pub fn host() -> Self {
        let mut image = Self::new(HOST_MODULE);
        image.define(TypeSchema::opaque(BASE_CONTRACT));
        image
    }

    /// Add a type, replacing an existing definition of the same name
    pub fn define(&mut self, schema: TypeSchema) {
        match self.types.iter_mut().find(|t| t.name == schema.name) {
            Some(existing) => *existing = schema,
            None => self.types.push(schema),
        }
    }

    /// Merge every type of `other` into this image
    pub fn merge(&mut self, other: ModuleImage) {
        for schema in other.types {
            self.define(schema);
        }
    }

    pub fn find(&self, name: &str) -> Option<&TypeSchema> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The set of modules a compilation needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    modules: BTreeSet<ModuleId>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime, host, and the model's defining module
    pub fn for_model(model: &ModelType) -> Self {
        let mut set = Self::new();
        set.insert(ModuleId::new(RUNTIME_MODULE));
        set.insert(ModuleId::new(HOST_MODULE));
        set.insert(model.module.clone());
        set
    }

    /// Returns `false` if the module was already present
    pub fn insert(&mut self, module: ModuleId) -> bool {
        self.modules.insert(module)
    }

    pub fn contains(&self, module: &ModuleId) -> bool {
        self.modules.contains(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter()
    }
}

/// A reference set with the content of every module
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    modules: BTreeMap<ModuleId, Vec<u8>>,
}

impl ResolvedReferences {
    pub(crate) fn from_map(modules: BTreeMap<ModuleId, Vec<u8>>) -> Self {
        Self { modules }
    }

    pub fn get(&self, module: &ModuleId) -> Option<&[u8]> {
        self.modules.get(module).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &[u8])> {
        self.modules.iter().map(|(id, bytes)| (id, bytes.as_slice()))
    }
}
