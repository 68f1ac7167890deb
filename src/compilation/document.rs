//! The intermediate document produced by the markup parser

use serde::{Deserialize, Serialize};

use crate::core::model::ModelType;

/// A directive segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Binds the renderer to its base contract and model type
    Inherits {
        base_contract: String,
        model_type: String,
    },
    /// Declares a named constructor dependency of the renderer
    Inject { name: String },
}

/// One unit of an [`IntermediateDocument`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Literal(String),
    Expression(String),
    Directive(Directive),
}

/// Ordered segments of one template.
///
/// The first segment is always the synthesized `Inherits` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateDocument {
    model: ModelType,
    segments: Vec<Segment>,
}

impl IntermediateDocument {
    pub(crate) fn new(model: ModelType, base_contract: &str, model_source_name: String) -> Self {
        Self {
            model,
            segments: vec![Segment::Directive(Directive::Inherits {
                base_contract: base_contract.to_string(),
                model_type: model_source_name,
            })],
        }
    }

    /// The model type the document was parsed for
    pub fn model(&self) -> &ModelType {
        &self.model
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Append literal text, merging with a preceding literal
    pub(crate) fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    pub(crate) fn push_expression(&mut self, code: String) {
        self.segments.push(Segment::Expression(code));
    }

    pub(crate) fn push_directive(&mut self, directive: Directive) {
        self.segments.push(Segment::Directive(directive));
    }

    /// Names declared by `Inject` directives, in declaration order
    pub fn injections(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Directive(Directive::Inject { name }) => Some(name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> IntermediateDocument {
        IntermediateDocument::new(
            ModelType::new("shop::Order", "shop"),
            "quill.templating.TemplateBase",
            "shop.Order".to_string(),
        )
    }

    #[test]
    fn test_document_starts_with_inherits() {
        let doc = document();
        assert_eq!(doc.segments().len(), 1);
        assert!(matches!(
            &doc.segments()[0],
            Segment::Directive(Directive::Inherits { model_type, .. }) if model_type == "shop.Order"
        ));
    }

    #[test]
    fn test_adjacent_literals_merge() {
        let mut doc = document();
        doc.push_literal("Hello ");
        doc.push_literal("");
        doc.push_literal("world");
        doc.push_expression("Model.Id".to_string());
        doc.push_literal("!");

        assert_eq!(
            &doc.segments()[1..],
            &[
                Segment::Literal("Hello world".to_string()),
                Segment::Expression("Model.Id".to_string()),
                Segment::Literal("!".to_string()),
            ]
        );
    }

    #[test]
    fn test_injections_in_order() {
        let mut doc = document();
        doc.push_directive(Directive::Inject {
            name: "Clock".to_string(),
        });
        doc.push_literal("x");
        doc.push_directive(Directive::Inject {
            name: "Tenant".to_string(),
        });

        assert_eq!(doc.injections().collect::<Vec<_>>(), vec!["Clock", "Tenant"]);
    }
}
