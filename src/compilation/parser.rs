//! Markup parser - splits template text into literal, expression and
//! directive segments.
//!
//! The delimiter is `@`:
//!
//! | Markup | Meaning |
//! |---|---|
//! | `@@` | a literal `@` |
//! | `@*  *@` | comment, dropped |
//! | `@( expr )` | explicit expression |
//! | `@Model.Items[0].Name` | implicit expression |
//! | `@inject Name` | constructor dependency declaration |
//!
//! An `@` directly after an ASCII letter or digit is literal text, which keeps
//! e-mail addresses intact.

use std::collections::HashSet;

use crate::compilation::document::{Directive, IntermediateDocument};
use crate::core::error::{Error, Result};
use crate::core::model::ModelType;
use crate::core::module::BASE_CONTRACT;

const INHERITS: &str = "inherits";
const INJECT: &str = "inject";

/// Parses template text into an [`IntermediateDocument`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupParser;

impl MarkupParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` for the given model type.
    ///
    /// Blank text fails with [`Error::EmptyTemplate`] before anything else is
    /// looked at; a parameterized model fails with
    /// [`Error::UnsupportedModel`] before the text is scanned.
    pub fn parse(&self, text: &str, model: &ModelType) -> Result<IntermediateDocument> {
        if text.trim().is_empty() {
            return Err(Error::EmptyTemplate);
        }

        let model_name = model.source_name()?;
        let mut document = IntermediateDocument::new(model.clone(), BASE_CONTRACT, model_name);

        Scanner::new(text).run(&mut document)?;

        tracing::debug!(
            "Parsed template for {} into {} segments",
            model,
            document.segments().len()
        );
        Ok(document)
    }
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    injected: HashSet<String>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            injected: HashSet::new(),
        }
    }

    fn run(mut self, document: &mut IntermediateDocument) -> Result<()> {
        let mut literal_start = 0;

        while let Some(offset) = self.text[self.pos..].find('@') {
            let at = self.pos + offset;
            self.pos = at + 1;

            let preceding = self.text[..at].chars().next_back();
            if preceding.is_some_and(|c| c.is_ascii_alphanumeric()) {
                continue;
            }

            document.push_literal(&self.text[literal_start..at]);

            match self.peek() {
                Some('@') => {
                    document.push_literal("@");
                    self.pos += 1;
                }
                Some('*') => self.skip_comment(at)?,
                Some('(') => {
                    let code = self.explicit_expression(at)?;
                    document.push_expression(code);
                }
                Some(c) if is_ident_start(c) => self.implicit(at, document)?,
                _ => {
                    return Err(self.error_at(
                        at,
                        "expected an expression, a directive or '@' after '@'",
                    ));
                }
            }

            literal_start = self.pos;
        }

        document.push_literal(&self.text[literal_start..]);
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.text[self.pos..].chars().nth(1)
    }

    fn read_identifier(&mut self) -> &'a str {
        let text = self.text;
        let rest = &text[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident_continue(c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        &rest[..len]
    }

    fn skip_comment(&mut self, at: usize) -> Result<()> {
        let body = self.pos + 1;
        match self.text[body..].find("*@") {
            Some(end) => {
                self.pos = body + end + 2;
                Ok(())
            }
            None => Err(self.error_at(at, "unterminated comment; expected '*@'")),
        }
    }

    fn explicit_expression(&mut self, at: usize) -> Result<String> {
        let open = self.pos;
        let close = self
            .find_closing(open, '(', ')')
            .ok_or_else(|| self.error_at(at, "unterminated expression; expected ')'"))?;

        let code = self.text[open + 1..close].trim();
        if code.is_empty() {
            return Err(self.error_at(at, "empty expression"));
        }

        self.pos = close + 1;
        Ok(code.to_string())
    }

    fn implicit(&mut self, at: usize, document: &mut IntermediateDocument) -> Result<()> {
        let start = self.pos;
        let name = self.read_identifier();

        if name == INHERITS {
            return Err(self.error_at(
                at,
                "'@inherits' conflicts with the directive bound to the model type",
            ));
        }

        if name == INJECT && matches!(self.peek(), Some(' ' | '\t')) {
            let directive = self.inject_directive(at)?;
            document.push_directive(directive);
            return Ok(());
        }

        loop {
            match self.peek() {
                Some('.') if self.peek_second().is_some_and(is_ident_start) => {
                    self.pos += 1;
                    self.read_identifier();
                }
                Some('[') => {
                    let close = self
                        .find_closing(self.pos, '[', ']')
                        .ok_or_else(|| self.error_at(at, "unterminated index; expected ']'"))?;
                    self.pos = close + 1;
                }
                _ => break,
            }
        }

        document.push_expression(self.text[start..self.pos].to_string());
        Ok(())
    }

    fn inject_directive(&mut self, at: usize) -> Result<Directive> {
        let line_end = self.text[self.pos..]
            .find('\n')
            .map_or(self.text.len(), |i| self.pos + i);
        let line = self.text[self.pos..line_end].trim();

        let valid = line.chars().next().is_some_and(is_ident_start)
            && line.chars().all(is_ident_continue);
        if !valid {
            return Err(self.error_at(at, "'@inject' expects a single dependency name"));
        }

        if !self.injected.insert(line.to_string()) {
            return Err(self.error_at(at, format!("dependency '{line}' is injected twice")));
        }

        self.pos = (line_end + 1).min(self.text.len());
        Ok(Directive::Inject {
            name: line.to_string(),
        })
    }

    /// Byte offset of the delimiter closing the one at `open`, skipping
    /// string literals.
    fn find_closing(&self, open: usize, opening: char, closing: char) -> Option<usize> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, c) in self.text[open..].char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            if c == '"' {
                in_string = true;
            } else if c == opening {
                depth += 1;
            } else if c == closing {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
        }

        None
    }

    fn error_at<S: Into<String>>(&self, offset: usize, message: S) -> Error {
        let before = &self.text[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit_once('\n')
            .map_or(before, |(_, tail)| tail)
            .chars()
            .count()
            + 1;

        Error::Parse {
            message: message.into(),
            line,
            column,
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::document::Segment;

    fn model() -> ModelType {
        ModelType::new("shop::models::Order", "shop")
    }

    fn parse(text: &str) -> Result<Vec<Segment>> {
        MarkupParser::new()
            .parse(text, &model())
            .map(|doc| doc.segments()[1..].to_vec())
    }

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn expr(s: &str) -> Segment {
        Segment::Expression(s.to_string())
    }

    #[test]
    fn test_synthesized_directive_comes_first() {
        let doc = MarkupParser::new().parse("Hi", &model()).unwrap();
        assert_eq!(
            doc.segments()[0],
            Segment::Directive(Directive::Inherits {
                base_contract: BASE_CONTRACT.to_string(),
                model_type: "shop.models.Order".to_string(),
            })
        );
    }

    #[test]
    fn test_literal_only() {
        assert_eq!(parse("Just text\n").unwrap(), vec![lit("Just text\n")]);
    }

    #[test]
    fn test_implicit_expression() {
        assert_eq!(
            parse("Hello @Model.Name!").unwrap(),
            vec![lit("Hello "), expr("Model.Name"), lit("!")]
        );
    }

    #[test]
    fn test_trailing_dot_is_literal() {
        assert_eq!(
            parse("Bye @Model.Name.").unwrap(),
            vec![lit("Bye "), expr("Model.Name"), lit(".")]
        );
    }

    #[test]
    fn test_indexed_expression() {
        assert_eq!(
            parse("@Model.Lines[0].Sku|@Model.Tags[\"a]\"]").unwrap(),
            vec![
                expr("Model.Lines[0].Sku"),
                lit("|"),
                expr("Model.Tags[\"a]\"]")
            ]
        );
    }

    #[test]
    fn test_explicit_expression() {
        assert_eq!(
            parse("[@( Model.Nick ?? (\"anon)\") )]").unwrap(),
            vec![lit("["), expr("Model.Nick ?? (\"anon)\")"), lit("]")]
        );
    }

    #[test]
    fn test_escaped_at_and_email() {
        assert_eq!(
            parse("mail ada@example.com or @@home").unwrap(),
            vec![lit("mail ada@example.com or @home")]
        );
    }

    #[test]
    fn test_comment_is_dropped() {
        assert_eq!(
            parse("a @* note @Model.X *@b").unwrap(),
            vec![lit("a b")]
        );
    }

    #[test]
    fn test_inject_directive() {
        let doc = MarkupParser::new()
            .parse("@inject Clock\nNow: @Clock.Now", &model())
            .unwrap();

        assert_eq!(
            &doc.segments()[1..],
            &[
                Segment::Directive(Directive::Inject {
                    name: "Clock".to_string()
                }),
                lit("Now: "),
                expr("Clock.Now"),
            ]
        );
        assert_eq!(doc.injections().collect::<Vec<_>>(), vec!["Clock"]);
    }

    #[test]
    fn test_blank_template_fails_first() {
        let generic = model().parameterized();
        for text in ["", "   ", "\n\t "] {
            let error = MarkupParser::new().parse(text, &generic).unwrap_err();
            assert!(matches!(error, Error::EmptyTemplate));
        }
    }

    #[test]
    fn test_generic_model_rejected_before_scanning() {
        let error = MarkupParser::new()
            .parse("@(", &model().parameterized())
            .unwrap_err();
        assert!(matches!(error, Error::UnsupportedModel { .. }));
    }

    #[test]
    fn test_unterminated_explicit_expression() {
        let error = parse("line one\n  @(Model.Name").unwrap_err();
        match error {
            Error::Parse {
                message,
                line,
                column,
            } => {
                assert!(message.contains("unterminated expression"));
                assert_eq!(line, 2);
                assert_eq!(column, 3);
            }
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_comment_and_index() {
        assert!(matches!(parse("@* open"), Err(Error::Parse { .. })));
        assert!(matches!(parse("@Model.Lines[0"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_empty_explicit_expression() {
        assert!(matches!(parse("x @( ) y"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_dangling_at() {
        assert!(matches!(parse("trailing @"), Err(Error::Parse { .. })));
        assert!(matches!(parse("@ space"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_inherits_conflicts() {
        let error = parse("@inherits Other<T>\nhi").unwrap_err();
        assert!(error.to_string().contains("conflicts"));
    }

    #[test]
    fn test_inject_requires_single_name() {
        assert!(matches!(parse("@inject \nx"), Err(Error::Parse { .. })));
        assert!(matches!(parse("@inject Clock Now\nx"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_duplicate_inject() {
        let error = parse("@inject Clock\n@inject Clock\nx").unwrap_err();
        assert!(error.to_string().contains("injected twice"));
    }
}
