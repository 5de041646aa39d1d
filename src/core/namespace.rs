use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::{Node, NodeKind};
use crate::core::metadata::{ArityFn, CompileTimeFns, ExpandFn, Meta};
use crate::env::Env;
use crate::form::{Form, Symbol};

pub const CORE_NAMESPACE: &str = "phel\\core";
pub const DEFAULT_NAMESPACE: &str = "user";
/// Qualifier of host-interop symbols, `php/strlen`.
pub const HOST_NAMESPACE: &str = "php";

type NsMap<V> = FxHashMap<Arc<str>, FxHashMap<Arc<str>, V>>;

//===----------------------------------------------------------------------===//
// GlobalTable
//
// Definitions and aliases collected while analyzing one compilation run.
// Only `def` and `ns` write to it; entries are never removed.
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone)]
pub struct GlobalTable {
    current: Arc<str>,
    definitions: NsMap<Meta>,
    // Aliases are scoped to the namespace that declared them.
    require_aliases: NsMap<Arc<str>>,
    use_aliases: NsMap<Arc<str>>,
    refers: NsMap<Arc<str>>,
    compile_time: FxHashMap<(Arc<str>, Arc<str>), CompileTimeFns>,
}

impl Default for GlobalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(ns: &str) -> Self {
        Self {
            current: Arc::from(ns),
            definitions: FxHashMap::default(),
            require_aliases: FxHashMap::default(),
            use_aliases: FxHashMap::default(),
            refers: FxHashMap::default(),
            compile_time: FxHashMap::default(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.current
    }

    pub fn set_namespace(&mut self, ns: &str) {
        self.current = Arc::from(ns);
    }

    pub fn has_namespace(&self, ns: &str) -> bool {
        self.definitions.contains_key(ns)
    }

    //===------------------------------------------------------------------===//
    // Definitions
    //===------------------------------------------------------------------===//

    pub fn add_definition(&mut self, ns: &str, name: &str, meta: Meta) {
        self.definitions.entry(Arc::from(ns)).or_default().insert(Arc::from(name), meta);
    }

    pub fn has_definition(&self, ns: &str, name: &str) -> bool {
        self.get_definition(ns, name).is_some()
    }

    pub fn get_definition(&self, ns: &str, name: &str) -> Option<&Meta> {
        self.definitions.get(ns).and_then(|defs| defs.get(name))
    }

    /// Registers a macro: a definition flagged `:macro` plus its expander.
    pub fn register_macro(&mut self, ns: &str, name: &str, meta: Meta, expander: ExpandFn) {
        self.add_definition(ns, name, meta.with("macro", Form::bool(true)));
        self.compile_time_entry(ns, name).macro_fn = Some(expander);
    }

    /// Registers a function that can be substituted at compile time when
    /// `arity` accepts the argument count.
    pub fn register_inline(
        &mut self,
        ns: &str,
        name: &str,
        meta: Meta,
        inline: ExpandFn,
        arity: Option<ArityFn>,
    ) {
        self.add_definition(ns, name, meta.with("inline", Form::bool(true)));
        let entry = self.compile_time_entry(ns, name);
        entry.inline_fn = Some(inline);
        entry.inline_arity = arity;
    }

    pub fn compile_time_fns(&self, ns: &str, name: &str) -> Option<&CompileTimeFns> {
        self.compile_time.get(&(Arc::from(ns), Arc::from(name)))
    }

    fn compile_time_entry(&mut self, ns: &str, name: &str) -> &mut CompileTimeFns {
        self.compile_time.entry((Arc::from(ns), Arc::from(name))).or_default()
    }

    //===------------------------------------------------------------------===//
    // Aliases
    //===------------------------------------------------------------------===//

    /// `(:require a\b :as c)` inside the current namespace.
    pub fn add_require_alias(&mut self, alias: &str, ns: &str) {
        self.scoped_insert(Scope::Require, alias, ns);
    }

    /// `(:use \A\B :as C)` inside the current namespace.
    pub fn add_use_alias(&mut self, alias: &str, class: &str) {
        self.scoped_insert(Scope::Use, alias, class);
    }

    /// `(:require a\b :refer [x])` makes `x` resolve into `a\b`.
    pub fn add_refer(&mut self, name: &str, ns: &str) {
        self.scoped_insert(Scope::Refer, name, ns);
    }

    pub fn require_alias(&self, alias: &str) -> Option<&str> {
        self.scoped_get(Scope::Require, alias)
    }

    pub fn use_alias(&self, alias: &str) -> Option<&str> {
        self.scoped_get(Scope::Use, alias)
    }

    pub fn refer(&self, name: &str) -> Option<&str> {
        self.scoped_get(Scope::Refer, name)
    }

    fn scope_map(&self, scope: Scope) -> &NsMap<Arc<str>> {
        match scope {
            Scope::Require => &self.require_aliases,
            Scope::Use => &self.use_aliases,
            Scope::Refer => &self.refers,
        }
    }

    fn scoped_insert(&mut self, scope: Scope, key: &str, value: &str) {
        let map = match scope {
            Scope::Require => &mut self.require_aliases,
            Scope::Use => &mut self.use_aliases,
            Scope::Refer => &mut self.refers,
        };
        map.entry(self.current.clone()).or_default().insert(Arc::from(key), Arc::from(value));
    }

    fn scoped_get(&self, scope: Scope, key: &str) -> Option<&str> {
        self.scope_map(scope).get(&self.current).and_then(|m| m.get(key)).map(|v| &**v)
    }

    //===------------------------------------------------------------------===//
    // Resolution
    //===------------------------------------------------------------------===//

    /// Namespace-based lookup of a symbol. Locals and `php/` symbols are
    /// handled by the analyzer before this is consulted.
    ///
    /// Order: `\Class` names, `use` aliases, qualified names (through a
    /// `require` alias or a known namespace), then the current namespace,
    /// referred names and finally the core namespace.
    pub fn resolve(&self, sym: &Symbol, env: &Env) -> Option<Node> {
        let name = sym.name();

        if sym.ns.is_none() {
            if name.starts_with('\\') {
                return Some(host_class(env, name));
            }
            if let Some(class) = self.use_alias(name) {
                return Some(host_class(env, class));
            }
        }

        if let Some(prefix) = sym.namespace() {
            let ns = self
                .require_alias(prefix)
                .or_else(|| (prefix == &*self.current || self.has_namespace(prefix)).then_some(prefix))?;
            return self.global_var(ns, name, env);
        }

        self.global_var(&self.current, name, env)
            .or_else(|| self.refer(name).and_then(|ns| self.global_var(ns, name, env)))
            .or_else(|| self.global_var(CORE_NAMESPACE, name, env))
    }

    fn global_var(&self, ns: &str, name: &str, env: &Env) -> Option<Node> {
        let meta = self.get_definition(ns, name)?;
        Some(Node::new(
            env,
            None,
            NodeKind::GlobalVar {
                namespace: Arc::from(ns),
                name: Symbol::new(name),
                meta: meta.clone(),
            },
        ))
    }
}

#[derive(Clone, Copy)]
enum Scope {
    Require,
    Use,
    Refer,
}

fn host_class(env: &Env, name: &str) -> Node {
    let name = if name.starts_with('\\') { name.to_string() } else { format!("\\{}", name) };
    Node::new(env, None, NodeKind::HostClassName { name: Arc::from(name) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_name(node: Option<Node>) -> Option<(String, String)> {
        match node?.kind {
            NodeKind::GlobalVar { namespace, name, .. } => Some((namespace.to_string(), name.to_string())),
            _ => None,
        }
    }

    #[test]
    fn resolves_current_namespace_before_core() {
        let mut table = GlobalTable::new();
        table.add_definition(CORE_NAMESPACE, "map", Meta::new());
        table.add_definition("user", "map", Meta::new());

        let env = Env::empty();
        assert_eq!(
            global_name(table.resolve(&Symbol::new("map"), &env)),
            Some(("user".to_string(), "map".to_string()))
        );
        table.set_namespace("other");
        assert_eq!(
            global_name(table.resolve(&Symbol::new("map"), &env)),
            Some((CORE_NAMESPACE.to_string(), "map".to_string()))
        );
    }

    #[test]
    fn qualified_symbols_go_through_require_aliases() {
        let mut table = GlobalTable::new();
        table.add_definition("app\\string", "upper", Meta::new());
        table.add_require_alias("s", "app\\string");

        let env = Env::empty();
        assert!(table.resolve(&Symbol::qualified("s", "upper"), &env).is_some());
        assert!(table.resolve(&Symbol::qualified("s", "lower"), &env).is_none());
        assert!(table.resolve(&Symbol::qualified("app\\string", "upper"), &env).is_some());
        assert!(table.resolve(&Symbol::qualified("nope", "upper"), &env).is_none());
    }

    #[test]
    fn use_aliases_yield_class_names() {
        let mut table = GlobalTable::new();
        table.add_use_alias("Date", "\\DateTimeImmutable");

        let node = table.resolve(&Symbol::new("Date"), &Env::empty());
        assert!(matches!(
            node.map(|n| n.kind),
            Some(NodeKind::HostClassName { name }) if &*name == "\\DateTimeImmutable"
        ));
    }

    #[test]
    fn aliases_are_scoped_to_their_namespace() {
        let mut table = GlobalTable::new();
        table.add_require_alias("s", "app\\string");
        assert_eq!(table.require_alias("s"), Some("app\\string"));
        table.set_namespace("other");
        assert_eq!(table.require_alias("s"), None);
    }
}
