use std::sync::Arc;

use crate::form::{Form, Keyword};

/// Definition metadata, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Meta {
    entries: Vec<(Keyword, Form)>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: Form) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: Form) {
        let key = Keyword::new(key);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Form> {
        self.entries.iter().find(|(k, _)| k.ns.is_none() && &*k.name == key).map(|(_, v)| v)
    }

    /// True when `key` is present and not `nil`/`false`.
    pub fn flag(&self, key: &str) -> bool {
        !matches!(self.get(key), None | Some(Form::Nil { .. }) | Some(Form::Bool { value: false, .. }))
    }

    pub fn is_macro(&self) -> bool {
        self.flag("macro")
    }

    pub fn is_inline(&self) -> bool {
        self.flag("inline")
    }

    pub fn is_private(&self) -> bool {
        self.flag("private")
    }

    pub fn doc(&self) -> Option<&str> {
        match self.get("doc") {
            Some(Form::Str { value, .. }) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Keyword, Form)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds metadata from a map literal. Non-keyword keys are skipped.
    pub fn from_entries(entries: &[(Form, Form)]) -> Self {
        let mut meta = Meta::new();
        for (key, value) in entries {
            if let Form::Keyword { value: kw, .. } = key {
                meta.entries.push((kw.clone(), value.clone()));
            }
        }
        meta
    }
}

//===----------------------------------------------------------------------===//
// Compile-time callables
//===----------------------------------------------------------------------===//

/// A macro or inline expander: raw argument forms in, replacement form out.
pub type ExpandFn = Arc<dyn Fn(&[Form]) -> Result<Form, String> + Send + Sync>;

/// Decides from the argument count whether an inline expansion applies.
pub type ArityFn = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// The compile-time half of a definition. Looked up by qualified name at
/// the single expansion call site in the analyzer.
#[derive(Clone, Default)]
pub struct CompileTimeFns {
    pub macro_fn: Option<ExpandFn>,
    pub inline_fn: Option<ExpandFn>,
    pub inline_arity: Option<ArityFn>,
}

impl CompileTimeFns {
    /// Whether the inline expander applies to a call with `argc` arguments.
    pub fn inlines(&self, argc: usize) -> bool {
        match (&self.inline_fn, &self.inline_arity) {
            (Some(_), Some(pred)) => pred(argc),
            (Some(_), None) => true,
            _ => false,
        }
    }
}

impl std::fmt::Debug for CompileTimeFns {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CompileTimeFns")
            .field("macro_fn", &self.macro_fn.is_some())
            .field("inline_fn", &self.inline_fn.is_some())
            .field("inline_arity", &self.inline_arity.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_read_truthiness() {
        let meta = Meta::new().with("macro", Form::bool(true)).with("private", Form::nil());
        assert!(meta.is_macro());
        assert!(!meta.is_private());
        assert!(!meta.is_inline());
    }

    #[test]
    fn insert_replaces_existing_key() {
        let meta = Meta::new().with("doc", Form::string("a")).with("doc", Form::string("b"));
        assert_eq!(meta.doc(), Some("b"));
        assert_eq!(meta.iter().count(), 1);
    }

    #[test]
    fn inline_arity_predicate_gates_expansion() {
        let fns = CompileTimeFns {
            macro_fn: None,
            inline_fn: Some(Arc::new(|_: &[Form]| Ok(Form::nil()))),
            inline_arity: Some(Arc::new(|n| n == 2)),
        };
        assert!(fns.inlines(2));
        assert!(!fns.inlines(3));
        assert!(!CompileTimeFns::default().inlines(2));
    }
}
