//! Compiler backend producing interpreted renderer units.
//!
//! The backend reads generated renderer source, checks it against the type
//! schemas of the resolved reference modules and encodes the result as a
//! [`UnitImage`] whose instructions the runtime executes directly.

use std::collections::HashMap;

use crate::compilation::codegen::GeneratedSource;
use crate::compilation::traits::CompilerBackend;
use crate::core::error::{Diagnostic, Error, Result};
use crate::core::module::{ModuleImage, ResolvedReferences, TypeSchema};
use crate::runtime::program::{
    CompiledUnit, ContractRef, Expr, Instruction, MODEL_ROOT, PathStep, TypeImage, UnitImage,
};

use super::expression::parse_expression;

/// Stateless backend; safe to call from many tasks at once
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpreterBackend;

impl InterpreterBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerBackend for InterpreterBackend {
    fn name(&self) -> &str {
        "interpreter"
    }

    fn compile(
        &self,
        source: &GeneratedSource,
        references: &ResolvedReferences,
    ) -> Result<CompiledUnit> {
        let mut diagnostics = Vec::new();

        let modules: Vec<ModuleImage> = references
            .iter()
            .filter_map(|(id, bytes)| match ModuleImage::from_bytes(bytes) {
                Ok(image) => Some(image),
                Err(e) => {
                    diagnostics.push(Diagnostic::new(format!(
                        "metadata of module '{id}' could not be read: {e}"
                    )));
                    None
                }
            })
            .collect();

        let types: HashMap<&str, &TypeSchema> = modules
            .iter()
            .flat_map(|module| module.types.iter())
            .map(|schema| (schema.name.as_str(), schema))
            .collect();

        let mut unit = UnitCompiler::new(&types, &mut diagnostics);
        unit.compile_source(&source.text);
        let image = unit.finish();

        if !diagnostics.is_empty() {
            tracing::debug!(
                "Compilation of renderer for {} failed with {} diagnostic(s)",
                source.model,
                diagnostics.len()
            );
            return Err(Error::Compilation { diagnostics });
        }

        match image {
            Some(image) => CompiledUnit::from_image(&image),
            None => Err(Error::Compilation {
                diagnostics: vec![Diagnostic::new("source produced no renderer type")],
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Declarations,
    Body,
    Done,
}

/// Single-use state for one compilation
struct UnitCompiler<'a> {
    types: &'a HashMap<&'a str, &'a TypeSchema>,
    diagnostics: &'a mut Vec<Diagnostic>,
    section: Section,
    unit: Option<String>,
    renderer: Option<(String, ContractRef)>,
    dependencies: Vec<String>,
    body: Vec<Instruction>,
}

impl<'a> UnitCompiler<'a> {
    fn new(
        types: &'a HashMap<&'a str, &'a TypeSchema>,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            types,
            diagnostics,
            section: Section::Header,
            unit: None,
            renderer: None,
            dependencies: Vec::new(),
            body: Vec::new(),
        }
    }

    fn error<S: Into<String>>(&mut self, line: usize, message: S) {
        self.diagnostics.push(Diagnostic::at_line(line, message));
    }

    fn compile_source(&mut self, text: &str) {
        let mut last_line = 0;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            last_line = line;

            let content = raw.trim();
            if content.is_empty() || content.starts_with("//") {
                continue;
            }

            let (keyword, rest) = content
                .split_once(char::is_whitespace)
                .map_or((content, ""), |(k, r)| (k, r.trim()));

            match (self.section, keyword) {
                (Section::Header, "unit") => self.unit_declaration(line, rest),
                (Section::Header, _) => {
                    self.error(line, "expected a 'unit' declaration");
                    self.section = Section::Declarations;
                }
                (Section::Declarations, "renderer") => self.renderer_declaration(line, rest),
                (Section::Declarations, "inject") => self.inject_declaration(line, rest),
                (Section::Declarations, "execute") => {
                    if self.renderer.is_none() {
                        self.error(line, "'execute' appears before a renderer declaration");
                    }
                    self.section = Section::Body;
                }
                (Section::Body, "literal") => self.literal_instruction(line, rest),
                (Section::Body, "write") => self.write_instruction(line, rest),
                (Section::Body, "end") => self.section = Section::Done,
                (Section::Done, _) => self.error(line, format!("unexpected '{keyword}' after 'end'")),
                (_, _) => self.error(line, format!("unexpected '{keyword}'")),
            }
        }

        match self.section {
            Section::Done => {}
            Section::Body => self.error(last_line, "missing 'end' of the execute block"),
            _ => self.error(last_line, "missing 'execute' block"),
        }
    }

    fn unit_declaration(&mut self, line: usize, rest: &str) {
        if rest.is_empty() {
            self.error(line, "'unit' requires a name");
        }
        self.unit = Some(rest.to_string());
        self.section = Section::Declarations;
    }

    fn renderer_declaration(&mut self, line: usize, rest: &str) {
        if self.renderer.is_some() {
            self.error(line, "duplicate renderer declaration");
            return;
        }

        let Some((name, contract)) = rest.split_once(':') else {
            self.error(line, "expected 'renderer <Name> : <Contract><<Model>>'");
            return;
        };
        let name = name.trim();
        let contract = contract.trim();

        let parsed = contract
            .strip_suffix('>')
            .and_then(|c| c.split_once('<'))
            .map(|(base, model)| (base.trim(), model.trim()));
        let Some((base, model)) = parsed else {
            self.error(line, format!("'{contract}' is not a bound contract"));
            return;
        };

        if !is_identifier(name) {
            self.error(line, format!("'{name}' is not a valid type name"));
        }
        for ty in [base, model] {
            if !self.types.contains_key(ty) {
                self.error(
                    line,
                    format!("type '{ty}' could not be found in the referenced modules"),
                );
            }
        }

        self.renderer = Some((
            name.to_string(),
            ContractRef {
                name: base.to_string(),
                model: model.to_string(),
            },
        ));
    }

    fn inject_declaration(&mut self, line: usize, rest: &str) {
        if !is_identifier(rest) {
            self.error(line, format!("'{rest}' is not a valid dependency name"));
        } else if rest == MODEL_ROOT || self.dependencies.iter().any(|d| d == rest) {
            self.error(line, format!("dependency '{rest}' is already defined"));
        } else {
            self.dependencies.push(rest.to_string());
        }
    }

    fn literal_instruction(&mut self, line: usize, rest: &str) {
        match serde_json::from_str::<String>(rest) {
            Ok(text) => self.body.push(Instruction::WriteLiteral(text)),
            Err(e) => self.error(line, format!("invalid literal: {e}")),
        }
    }

    fn write_instruction(&mut self, line: usize, rest: &str) {
        match parse_expression(rest) {
            Ok(expr) => {
                self.check_expression(line, &expr);
                self.body.push(Instruction::Write(expr));
            }
            Err(e) => self.error(line, format!("invalid expression '{rest}': {e}")),
        }
    }

    fn check_expression(&mut self, line: usize, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Coalesce(operands) => {
                for operand in operands {
                    self.check_expression(line, operand);
                }
            }
            Expr::Path { root, steps } if root == MODEL_ROOT => self.check_model_path(line, steps),
            Expr::Path { root, .. } => {
                if !self.dependencies.iter().any(|d| d == root) {
                    self.error(line, format!("the name '{root}' does not exist in this context"));
                }
            }
        }
    }

    /// Walk member steps through known schemas; stops at the first opaque,
    /// unknown or indexed type.
    fn check_model_path(&mut self, line: usize, steps: &[PathStep]) {
        let Some((_, contract)) = &self.renderer else {
            return;
        };

        let types = self.types;
        let mut current = contract.model.clone();
        let mut walked = MODEL_ROOT.to_string();

        for step in steps {
            let PathStep::Member(member) = step else {
                return;
            };
            let Some(schema) = types.get(current.as_str()) else {
                return;
            };

            match schema.member(member) {
                Some(Some(member_type)) => current = member_type.to_string(),
                Some(None) => return,
                None => {
                    self.error(
                        line,
                        format!("'{walked}' of type '{current}' has no member '{member}'"),
                    );
                    return;
                }
            }
            walked = format!("{walked}.{member}");
        }
    }

    fn finish(self) -> Option<UnitImage> {
        let (name, base) = self.renderer?;
        Some(UnitImage {
            name: self.unit.unwrap_or_default(),
            types: vec![TypeImage {
                name,
                base,
                dependencies: self.dependencies,
                body: self.body,
            }],
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::loader::RendererLoader;
    use crate::core::model::ModelType;
    use crate::core::module::ModuleId;
    use std::collections::BTreeMap;

    fn references(extra: Option<ModuleImage>) -> ResolvedReferences {
        let mut map = BTreeMap::new();
        for image in [ModuleImage::runtime(), ModuleImage::host()]
            .into_iter()
            .chain(extra)
        {
            map.insert(image.name.clone(), image.to_bytes().unwrap());
        }
        ResolvedReferences::from_map(map)
    }

    fn shop() -> ModuleImage {
        let mut image = ModuleImage::new("shop");
        image.define(TypeSchema::with_members(
            "shop.Order",
            [("Id", "int"), ("Customer", "shop.Customer"), ("Meta", "object")],
        ));
        image.define(TypeSchema::with_members("shop.Customer", [("Name", "string")]));
        image
    }

    fn source(body: &str) -> GeneratedSource {
        GeneratedSource {
            text: format!(
                "// generated\nunit quill.generated\nrenderer Template : quill.templating.TemplateBase<shop.Order>\ninject Clock\nexecute\n{body}end\n"
            ),
            model: ModelType::new("shop::Order", "shop"),
        }
    }

    fn diagnostics(result: Result<CompiledUnit>) -> Vec<Diagnostic> {
        match result {
            Err(Error::Compilation { diagnostics }) => diagnostics,
            other => panic!("expected compilation error, got {other:?}"),
        }
    }

    #[test]
    fn test_compiles_and_loads() {
        let unit = InterpreterBackend::new()
            .compile(
                &source(
                    "    literal \"Order \"\n    write Model.Id\n    write Model.customer.Name ?? Clock.Now\n",
                ),
                &references(Some(shop())),
            )
            .unwrap();

        let renderer = RendererLoader::new()
            .load(&unit, &ModelType::new("shop::Order", "shop"))
            .unwrap();
        assert_eq!(renderer.name(), "Template");
        assert_eq!(renderer.dependencies(), ["Clock".to_string()]);
        assert_eq!(renderer.body().len(), 3);
        assert_eq!(
            renderer.body()[0],
            Instruction::WriteLiteral("Order ".to_string())
        );
    }

    #[test]
    fn test_opaque_members_are_not_checked() {
        let result = InterpreterBackend::new().compile(
            &source("    write Model.Meta.Anything.Deep\n    write Model.Customer[\"x\"].y\n"),
            &references(Some(shop())),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_member_is_reported_with_line() {
        let diagnostics = diagnostics(InterpreterBackend::new().compile(
            &source("    write Model.Customer.Email\n"),
            &references(Some(shop())),
        ));

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, Some(6));
        assert!(diagnostics[0].message.contains("no member 'Email'"));
    }

    #[test]
    fn test_all_diagnostics_are_collected() {
        let diagnostics = diagnostics(InterpreterBackend::new().compile(
            &source("    write Missing.Value\n    write Model.(\n    literal nope\n"),
            &references(Some(shop())),
        ));

        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics[0].message.contains("'Missing' does not exist"));
    }

    #[test]
    fn test_missing_model_type() {
        let diagnostics = diagnostics(
            InterpreterBackend::new().compile(&source(""), &references(None)),
        );
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("'shop.Order' could not be found"))
        );
    }

    #[test]
    fn test_structure_errors() {
        let backend = InterpreterBackend::new();
        let model = ModelType::new("shop::Order", "shop");
        let refs = references(Some(shop()));

        for text in [
            "renderer Template : quill.templating.TemplateBase<shop.Order>\nexecute\nend\n",
            "unit u\nexecute\nend\n",
            "unit u\nrenderer Template : quill.templating.TemplateBase<shop.Order>\nexecute\n",
            "unit u\nrenderer A : quill.templating.TemplateBase<shop.Order>\nrenderer B : quill.templating.TemplateBase<shop.Order>\nexecute\nend\n",
            "unit u\nrenderer Template : quill.templating.TemplateBase<shop.Order>\ninject Clock\ninject Clock\nexecute\nend\n",
            "unit u\nrenderer Template : quill.templating.TemplateBase<shop.Order>\nexecute\nend\nwrite Model\n",
        ] {
            let result = backend.compile(
                &GeneratedSource {
                    text: text.to_string(),
                    model: model.clone(),
                },
                &refs,
            );
            assert!(
                matches!(result, Err(Error::Compilation { .. })),
                "expected failure for {text:?}"
            );
        }
    }

    #[test]
    fn test_unreadable_module_is_a_diagnostic() {
        let mut map = BTreeMap::new();
        map.insert(ModuleId::new("broken"), b"\x00\x01".to_vec());
        let diagnostics = diagnostics(
            InterpreterBackend::new().compile(&source(""), &ResolvedReferences::from_map(map)),
        );
        assert!(diagnostics[0].message.contains("module 'broken'"));
    }
}
