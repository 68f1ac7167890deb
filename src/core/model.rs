//! Model type descriptors.
//!
//! A template is bound to exactly one model type. The descriptor carries what
//! the pipeline needs to know about that type without touching an instance:
//! its qualified name, the module that defines it and whether it is
//! parameterized.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::module::{ModuleId, RUNTIME_MODULE};

/// Characters that mark a compound or parameterized type name
const COMPOUND_MARKERS: [char; 5] = ['<', '(', '[', '&', ';'];

/// Identity of the model type a template is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelType {
    /// Fully qualified name, e.g. `shop::models::Order` or `Shop.Models+Line`
    pub qualified_name: String,
    /// The module that defines the type
    pub module: ModuleId,
    /// Whether the type is parameterized (generic)
    pub parameterized: bool,
}

impl ModelType {
    /// Describe a non-generic type defined in `module`
    pub fn new<N: Into<String>, M: Into<ModuleId>>(qualified_name: N, module: M) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            module: module.into(),
            parameterized: false,
        }
    }

    /// Mark the type as parameterized
    pub fn parameterized(mut self) -> Self {
        self.parameterized = true;
        self
    }

    /// Describe a Rust type from its compiler-provided name.
    ///
    /// The defining module is the crate the type lives in. Generic, tuple,
    /// slice, array and reference types are flagged as parameterized.
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    pub(crate) fn from_type_name(type_name: &str) -> Self {
        let parameterized = type_name.contains(COMPOUND_MARKERS);
        let module = match type_name.split_once("::") {
            Some((krate, _)) if !krate.contains(COMPOUND_MARKERS) => ModuleId::new(krate),
            _ => ModuleId::new(RUNTIME_MODULE),
        };

        Self {
            qualified_name: type_name.to_string(),
            module,
            parameterized,
        }
    }

    /// The name as it must appear in generated source.
    ///
    /// Path (`::`) and nested-type (`+`) separators become `.`.
    pub fn source_name(&self) -> Result<String> {
        if self.parameterized {
            return Err(Error::UnsupportedModel {
                model: self.qualified_name.clone(),
                reason: "generic models are not supported".to_string(),
            });
        }

        let name = self.qualified_name.trim();
        if name.is_empty() {
            return Err(Error::UnsupportedModel {
                model: self.qualified_name.clone(),
                reason: "the full name of the model type is empty".to_string(),
            });
        }

        Ok(name.replace("::", ".").replace('+', "."))
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;

    #[test]
    fn test_model_type_of_plain_struct() {
        let model = ModelType::of::<Person>();
        assert_eq!(model.module, ModuleId::new("quill"));
        assert!(!model.parameterized);
        assert_eq!(
            model.source_name().unwrap(),
            "quill.core.model.tests.Person"
        );
    }

    #[test]
    fn test_model_type_of_generic_is_unsupported() {
        let model = ModelType::of::<Vec<Person>>();
        assert!(model.parameterized);
        let error = model.source_name().unwrap_err();
        assert!(matches!(error, Error::UnsupportedModel { .. }));
        assert!(error.to_string().contains("generic models are not supported"));
    }

    #[test]
    fn test_model_type_of_compound_types() {
        assert!(ModelType::of::<(Person, Person)>().parameterized);
        assert!(ModelType::of::<[Person]>().parameterized);
        assert!(ModelType::of::<&Person>().parameterized);
    }

    #[test]
    fn test_primitive_lives_in_runtime_module() {
        let model = ModelType::of::<u32>();
        assert_eq!(model.module, ModuleId::new(RUNTIME_MODULE));
        assert_eq!(model.source_name().unwrap(), "u32");
    }

    #[test]
    fn test_nested_separator_normalized() {
        let model = ModelType::new("Shop.Models.Order+Line", "shop");
        assert_eq!(model.source_name().unwrap(), "Shop.Models.Order.Line");
    }

    #[test]
    fn test_blank_name_rejected() {
        let model = ModelType::new("  ", "shop");
        assert!(matches!(
            model.source_name(),
            Err(Error::UnsupportedModel { .. })
        ));
    }

    #[test]
    fn test_explicit_parameterized_flag() {
        let model = ModelType::new("shop::Page", "shop").parameterized();
        assert!(model.source_name().is_err());
        assert_eq!(model.to_string(), "shop::Page");
    }
}
