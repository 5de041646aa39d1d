//! Drives reader, analyzer and emitter over a whole source text.

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::ast::{Node, NodeKind};
use crate::codegen::{Emitter, EmitterResult};
use crate::config::CompileOptions;
use crate::core::{prelude, GlobalTable};
use crate::env::Env;
use crate::error::{error_at, AnalyzerError, SpannedResult};
use crate::form::Form;
use crate::reader;

/// The PHP for a whole source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    /// Concatenated code of every form, without the `<?php` opener.
    pub code: String,
    /// Per-form results, in source order.
    pub forms: Vec<EmitterResult>,
}

/// What a file declares in its leading `ns` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub namespace: String,
    pub dependencies: Vec<String>,
}

pub struct Compiler {
    options: CompileOptions,
    analyzer: Analyzer,
    emitter: Emitter,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let mut globals = GlobalTable::with_namespace(&options.default_namespace);
        if options.load_prelude {
            prelude::install(&mut globals);
        }
        let emitter = Emitter::new(options.source_maps).with_indent_width(options.indent_width);
        Self { options, analyzer: Analyzer::new(globals), emitter }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut Analyzer {
        &mut self.analyzer
    }

    /// Analyzes and emits one top-level form.
    pub fn compile_form(&mut self, form: &Form) -> SpannedResult<EmitterResult> {
        let node = self.analyze_form(form)?;
        Ok(self.emitter.emit(&node))
    }

    pub fn analyze_form(&mut self, form: &Form) -> SpannedResult<Node> {
        debug!(target: "phelc::compiler", form = %form, "compiling top-level form");
        self.analyzer.analyze(form, &Env::empty())
    }

    /// Analyzes every form of `source` without emitting.
    pub fn analyze_source(&mut self, source: &str, file: &str) -> SpannedResult<Vec<Node>> {
        reader::read_all(source, file)?.iter().map(|form| self.analyze_form(form)).collect()
    }

    /// Compiles all of `source`, stopping at the first error.
    pub fn compile(&mut self, source: &str, file: &str) -> SpannedResult<CompiledUnit> {
        let forms = reader::read_all(source, file)?
            .iter()
            .map(|form| self.compile_form(form))
            .collect::<SpannedResult<Vec<_>>>()?;

        let code = forms.iter().map(|result| self.render(result)).collect();
        Ok(CompiledUnit { code, forms })
    }

    /// Compiles each form on its own: a failing form does not stop the
    /// ones after it. A read error yields a single failed entry.
    pub fn compile_each(&mut self, source: &str, file: &str) -> Vec<SpannedResult<EmitterResult>> {
        match reader::read_all(source, file) {
            Ok(forms) => forms.iter().map(|form| self.compile_form(form)).collect(),
            Err(err) => vec![Err(err)],
        }
    }

    fn render(&self, result: &EmitterResult) -> String {
        let mut out = String::new();
        if let Some(mappings) = &result.source_map {
            out.push_str(&format!("// {}\n// ;;{}\n", result.source_name, mappings));
        }
        out.push_str(result.code.trim_end_matches('\n'));
        out.push('\n');
        out
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

/// Reads the namespace and dependencies from the first form of `source`,
/// which must be an `ns` form.
pub fn extract_namespace(source: &str, file: &str) -> SpannedResult<NamespaceInfo> {
    let forms = reader::read_all(source, file)?;
    let Some(first) = forms.first() else {
        return Err(error_at(
            None,
            AnalyzerError::InvalidForm { reason: format!("Cannot extract namespace from empty file {}", file) },
        ));
    };

    let node = Analyzer::default().analyze(first, &Env::empty())?;
    match node.kind {
        NodeKind::Ns { namespace, requires } => Ok(NamespaceInfo {
            namespace: namespace.to_string(),
            dependencies: requires.iter().map(|r| r.to_string()).collect(),
        }),
        _ => Err(error_at(
            first.loc(),
            AnalyzerError::InvalidForm { reason: format!("Cannot extract namespace from {}", file) },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_joins_forms() {
        let unit = Compiler::default().compile("(def x 1)\nx", "t.phel").expect("compiles");
        assert_eq!(unit.forms.len(), 2);
        assert!(unit.code.contains("addDefinition("));
        assert!(unit.code.ends_with("\\Phel\\Lang\\Registry::getInstance()->getDefinition(\"user\", \"x\");\n"));
    }

    #[test]
    fn compile_each_isolates_errors() {
        let results = Compiler::default().compile_each("(def x 1) nope (def y 2)", "t.phel");
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().map_err(|e| e.message()).unwrap_err(),
            "Cannot resolve symbol 'nope'"
        );
        assert!(results[2].is_ok());
    }

    #[test]
    fn source_maps_are_prefixed() {
        let mut compiler = Compiler::new(CompileOptions::default().with_source_maps());
        let unit = compiler.compile("1", "t.phel").expect("compiles");
        assert_eq!(unit.code, "// t.phel\n// ;;AAAA,CAAA\n1;\n");
    }

    #[test]
    fn extracts_namespace_and_dependencies() {
        let info = extract_namespace("(ns app\\main (:require app\\util :as u))\n(def x 1)", "main.phel")
            .expect("extracts");
        assert_eq!(info.namespace, "app\\main");
        assert_eq!(info.dependencies, vec!["phel\\core".to_string(), "app\\util".to_string()]);

        assert!(extract_namespace("(def x 1)", "x.phel").is_err());
    }
}
