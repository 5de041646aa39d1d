//! Turns forms into [`Node`]s.
//!
//! The analyzer owns the [`GlobalTable`] for the run and a
//! [`SymbolGenerator`] for synthetic names. Lexical state travels in the
//! [`Env`] passed down each call.

mod destructure;
mod invoke;
mod special_forms;
mod symbol;

use crate::ast::{Node, NodeKind};
use crate::core::{prelude, GlobalTable, SpecialForm, SymbolGenerator};
use crate::env::Env;
use crate::error::{error_at, AnalyzerError, SpannedResult};
use crate::form::{Form, Location};

pub use symbol::is_valid_identifier;

pub struct Analyzer {
    globals: GlobalTable,
    gensym: SymbolGenerator,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(GlobalTable::new())
    }
}

impl Analyzer {
    pub fn new(globals: GlobalTable) -> Self {
        Self { globals, gensym: SymbolGenerator::new() }
    }

    /// An analyzer whose global table already holds the core macros and
    /// inline functions.
    pub fn with_prelude() -> Self {
        let mut globals = GlobalTable::new();
        prelude::install(&mut globals);
        Self::new(globals)
    }

    pub fn globals(&self) -> &GlobalTable {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut GlobalTable {
        &mut self.globals
    }

    //===------------------------------------------------------------------===//
    // Dispatch
    //===------------------------------------------------------------------===//

    pub fn analyze(&mut self, form: &Form, env: &Env) -> SpannedResult<Node> {
        match form {
            Form::Nil { loc }
            | Form::Bool { loc, .. }
            | Form::Int { loc, .. }
            | Form::Float { loc, .. }
            | Form::Str { loc, .. }
            | Form::Keyword { loc, .. } => {
                Ok(Node::new(env, loc.clone(), NodeKind::Literal { value: form.clone() }))
            }
            Form::Symbol { loc, value } => self.analyze_symbol(value, loc.as_ref(), env),
            Form::Vector { loc, items } => {
                let items = self.analyze_operands(items, env)?;
                Ok(Node::new(env, loc.clone(), NodeKind::Vector { items }))
            }
            Form::Array { loc, items } => {
                let items = self.analyze_operands(items, env)?;
                Ok(Node::new(env, loc.clone(), NodeKind::Array { items }))
            }
            Form::Set { loc, items } => {
                let items = self.analyze_operands(items, env)?;
                Ok(Node::new(env, loc.clone(), NodeKind::Set { items }))
            }
            Form::Map { loc, entries } => {
                let operand = env.as_operand();
                let entries = entries
                    .iter()
                    .map(|(k, v)| -> SpannedResult<(Node, Node)> {
                        Ok((self.analyze(k, &operand)?, self.analyze(v, &operand)?))
                    })
                    .collect::<SpannedResult<Vec<_>>>()?;
                Ok(Node::new(env, loc.clone(), NodeKind::Table { entries }))
            }
            Form::List { loc, items } if items.is_empty() => {
                Ok(Node::new(env, loc.clone(), NodeKind::Literal { value: form.clone() }))
            }
            Form::List { items, .. } => {
                let special = items[0].as_symbol().and_then(SpecialForm::from_symbol);
                match special {
                    Some(special) => self.analyze_special_form(special, form, &items[1..], env),
                    None => self.analyze_invoke(form, items, env),
                }
            }
        }
    }

    /// Analyzes each form in a value position.
    fn analyze_operands(&mut self, forms: &[Form], env: &Env) -> SpannedResult<Vec<Node>> {
        let operand = env.as_operand();
        forms.iter().map(|form| self.analyze(form, &operand)).collect()
    }

    /// Analyzes `forms` as the body of an implicit `do`.
    fn analyze_body(&mut self, forms: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        self.analyze(&do_form(forms, loc), env)
    }
}

//===----------------------------------------------------------------------===//
// Helpers
//===----------------------------------------------------------------------===//

/// `(do forms...)`
fn do_form(forms: &[Form], loc: Option<&Location>) -> Form {
    let mut items = Vec::with_capacity(forms.len() + 1);
    items.push(Form::symbol("do"));
    items.extend_from_slice(forms);
    Form::list(items).with_loc(loc.cloned())
}

fn wrong_args(loc: Option<&Location>, message: impl Into<String>) -> crate::error::Diagnostic {
    error_at(loc, AnalyzerError::WrongArgumentCount { error_str: message.into() })
}

fn invalid_form(loc: Option<&Location>, message: impl Into<String>) -> crate::error::Diagnostic {
    error_at(loc, AnalyzerError::InvalidForm { reason: message.into() })
}

fn nil_node(env: &Env) -> Node {
    Node::new(env, None, NodeKind::Literal { value: Form::nil() })
}
