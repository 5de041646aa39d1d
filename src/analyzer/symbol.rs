use once_cell::sync::Lazy;
use regex::Regex;

use super::Analyzer;
use crate::ast::{Node, NodeKind};
use crate::codegen::munge::munge;
use crate::core::HOST_NAMESPACE;
use crate::env::Env;
use crate::error::{error_at, AnalyzerError, SpannedResult};
use crate::form::{Location, Symbol};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*$")
        .expect("identifier pattern is valid")
});

/// Whether `name` can become a PHP variable: it must start with a letter or
/// underscore, and its munged form must be a PHP identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    let starts_well = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii());
    starts_well && IDENTIFIER.is_match(&munge(name))
}

pub(super) fn check_identifier(sym: &Symbol, loc: Option<&Location>) -> SpannedResult<()> {
    if sym.ns.is_none() && is_valid_identifier(sym.name()) {
        Ok(())
    } else {
        Err(error_at(
            loc,
            AnalyzerError::InvalidSymbol {
                reason: format!("Variable names must start with a letter or underscore: {}", sym),
            },
        ))
    }
}

impl Analyzer {
    /// `php/name` symbols and locals resolve here; everything else goes
    /// through the global table.
    pub(super) fn analyze_symbol(
        &mut self,
        sym: &Symbol,
        loc: Option<&Location>,
        env: &Env,
    ) -> SpannedResult<Node> {
        if sym.namespace() == Some(HOST_NAMESPACE) {
            return Ok(Node::new(env, loc.cloned(), NodeKind::HostVar { name: sym.name.clone() }));
        }

        if env.has_local(sym) {
            let name = env.emitted_name(sym).clone();
            return Ok(Node::new(env, loc.cloned(), NodeKind::LocalVar { name }));
        }

        match self.globals.resolve(sym, env) {
            Some(mut node) => {
                node.loc = loc.cloned();
                Ok(node)
            }
            None => Err(error_at(loc, AnalyzerError::UnresolvedSymbol { name: sym.to_string() })),
        }
    }
}
