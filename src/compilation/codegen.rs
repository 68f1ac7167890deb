//! Code generator - turns an intermediate document into the source text of a
//! renderer type.
//!
//! The emitted unit looks like this:
//!
//! ```text
//! // generated by quill; do not edit
//! unit quill.generated
//! renderer Template : quill.templating.TemplateBase<shop.models.Order>
//! inject Clock
//! execute
//!     literal "Order "
//!     write Model.Id
//! end
//! ```

use crate::compilation::document::{Directive, IntermediateDocument, Segment};
use crate::core::error::Result;
use crate::core::model::ModelType;

/// Name of the generated renderer type; the loader discovers it by this name
pub const RENDERER_TYPE_NAME: &str = "Template";

/// Name of every generated compilation unit
pub const GENERATED_UNIT: &str = "quill.generated";

const HEADER: &str = "// generated by quill; do not edit";
const INDENT: &str = "    ";

/// Source text of one renderer type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub text: String,
    pub model: ModelType,
}

/// Emits renderer source from an [`IntermediateDocument`]
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, document: &IntermediateDocument) -> Result<GeneratedSource> {
        // Generic models never reach emission
        document.model().source_name()?;

        let mut lines = vec![HEADER.to_string(), format!("unit {GENERATED_UNIT}")];
        let mut body = Vec::new();

        for segment in document.segments() {
            match segment {
                Segment::Directive(Directive::Inherits {
                    base_contract,
                    model_type,
                }) => {
                    lines.push(format!(
                        "renderer {RENDERER_TYPE_NAME} : {base_contract}<{model_type}>"
                    ));
                }
                Segment::Directive(Directive::Inject { name }) => {
                    lines.push(format!("inject {name}"));
                }
                Segment::Literal(text) => {
                    body.push(format!("{INDENT}literal {}", serde_json::to_string(text)?));
                }
                Segment::Expression(code) => {
                    body.push(format!("{INDENT}write {}", fold_lines(code)));
                }
            }
        }

        lines.push("execute".to_string());
        lines.extend(body);
        lines.push("end".to_string());

        let mut text = lines.join("\n");
        text.push('\n');

        tracing::debug!(
            "Generated {} lines of renderer source for {}",
            text.lines().count(),
            document.model()
        );

        Ok(GeneratedSource {
            text,
            model: document.model().clone(),
        })
    }
}

/// Put expression code on one line. Line breaks between tokens become
/// spaces; inside string literals they become escapes.
fn fold_lines(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    out.push_str("\\r\\n");
                }
                '\r' => out.push_str("\\r"),
                '\n' => out.push_str("\\n"),
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push(' ');
            }
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::parser::MarkupParser;
    use crate::core::error::Error;

    fn model() -> ModelType {
        ModelType::new("shop::models::Order", "shop")
    }

    fn generate(text: &str) -> GeneratedSource {
        let document = MarkupParser::new().parse(text, &model()).unwrap();
        CodeGenerator::new().generate(&document).unwrap()
    }

    #[test]
    fn test_generates_renderer_in_segment_order() {
        let source = generate("Order @Model.Id for @(Model.Customer)\n");

        assert_eq!(
            source.text,
            "// generated by quill; do not edit\n\
             unit quill.generated\n\
             renderer Template : quill.templating.TemplateBase<shop.models.Order>\n\
             execute\n\
             \x20   literal \"Order \"\n\
             \x20   write Model.Id\n\
             \x20   literal \" for \"\n\
             \x20   write Model.Customer\n\
             \x20   literal \"\\n\"\n\
             end\n"
        );
        assert_eq!(source.model, model());
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let source = generate("say \"hi\"\\ \t");
        assert!(source.text.contains(r#"literal "say \"hi\"\\ \t""#));
    }

    #[test]
    fn test_injections_are_declared_before_body() {
        let source = generate("@inject Clock\n@inject Tenant\n@Clock.Now");
        let lines: Vec<&str> = source.text.lines().collect();

        assert_eq!(lines[3], "inject Clock");
        assert_eq!(lines[4], "inject Tenant");
        assert_eq!(lines[5], "execute");
        assert_eq!(lines[6], "    write Clock.Now");
    }

    #[test]
    fn test_multiline_expression_is_folded() {
        let source = generate("@(Model.Nick\n ?? \"anon\")");
        assert!(source.text.contains("    write Model.Nick  ?? \"anon\"\n"));
    }

    #[test]
    fn test_line_breaks_inside_strings_are_escaped() {
        let source = generate("[@(\"a\nb\" ?? \"c\r\nd\\\"\n\")]");
        assert!(
            source
                .text
                .contains(r#"    write "a\nb" ?? "c\r\nd\"\n""#),
            "{}",
            source.text
        );
    }

    #[test]
    fn test_generic_model_rejected_before_emission() {
        let document = MarkupParser::new().parse("hi", &model()).unwrap();
        let generic = IntermediateDocument::new(
            model().parameterized(),
            crate::core::module::BASE_CONTRACT,
            "shop.models.Order".to_string(),
        );

        assert!(CodeGenerator::new().generate(&document).is_ok());
        assert!(matches!(
            CodeGenerator::new().generate(&generic),
            Err(Error::UnsupportedModel { .. })
        ));
    }
}
