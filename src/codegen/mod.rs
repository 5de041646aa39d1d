//! PHP code generation.
//!
//! Turns an analyzed [`Node`] tree into PHP source. The shape of the code
//! for each node depends on the evaluation context recorded in its env:
//!
//! - `Return`: the value is returned, `return X;`
//! - `Statement`: the value is discarded, `X;`
//! - `Expression`: the value is used in place, `X`
//!
//! Constructs that only exist as statements in PHP (`try`, `foreach`,
//! `throw`, a `do` with statements, a `let`) are wrapped in an immediately
//! invoked closure when they appear in expression context. The closure
//! captures every visible local by reference.

pub mod literal;
pub mod munge;
pub mod output;
pub mod source_map;

use std::sync::Arc;

use tracing::debug;

use crate::ast::{Binding, Node, NodeKind};
use crate::core::CORE_NAMESPACE;
use crate::env::{Env, EvalContext};
use crate::form::{Location, Symbol};

use literal::{php_string, quoted, TYPE_FACTORY};
use munge::{munge, munge_ns};
use output::OutputBuffer;
use source_map::encode_mappings;

const REGISTRY: &str = "\\Phel\\Lang\\Registry::getInstance()";
const TRUTHY: &str = "\\Phel\\Lang\\Truthy::isTruthy";
const RUNTIME: &str = "\\Phel\\Runtime\\RuntimeSingleton::getInstance()";

/// Host functions emitted as infix operators when called.
const INFIX_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", ".", "=", "==", "===", "!=", "!==", "<", ">", "<=", ">=", "<=>",
    "&", "|", "^", "<<", ">>", "&&", "||", "and", "or", "xor", "instanceof",
];

pub(crate) fn is_infix(name: &str) -> bool {
    INFIX_OPERATORS.contains(&name)
}

/// Host operators that also have a one-operand prefix form.
pub(crate) fn is_prefix(name: &str) -> bool {
    matches!(name, "!" | "-" | "+" | "~")
}

/// Output of emitting one top-level node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterResult {
    pub code: String,
    /// Encoded `mappings`, when source maps are enabled.
    pub source_map: Option<String>,
    /// File of the node, or `string` when it has no location.
    pub source_name: Arc<str>,
}

pub struct Emitter {
    source_maps: bool,
    indent_width: usize,
    out: OutputBuffer,
}

impl Emitter {
    pub fn new(source_maps: bool) -> Self {
        Self { source_maps, indent_width: 2, out: OutputBuffer::new(2, source_maps) }
    }

    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    /// Emits a top-level node. Indentation and source map state start fresh
    /// on every call.
    pub fn emit(&mut self, node: &Node) -> EmitterResult {
        debug!(target: "phelc::codegen", kind = node.kind_name(), context = %node.context(), "emitting");

        self.out = OutputBuffer::new(self.indent_width, self.source_maps);
        self.emit_node(node);

        let out = std::mem::replace(&mut self.out, OutputBuffer::new(self.indent_width, false));
        let (code, mappings) = out.into_parts();

        EmitterResult {
            code,
            source_map: self.source_maps.then(|| encode_mappings(&mappings)),
            source_name: node.loc.as_ref().map_or_else(|| Arc::from("string"), |loc| loc.file.clone()),
        }
    }

    //===------------------------------------------------------------------===//
    // Dispatch
    //===------------------------------------------------------------------===//

    fn emit_node(&mut self, node: &Node) {
        let loc = node.loc.as_ref();
        match &node.kind {
            NodeKind::Literal { value } | NodeKind::Quote { value } => {
                self.emit_value(node, &quoted(value));
            }
            NodeKind::LocalVar { name } => self.emit_value(node, &variable(name)),
            NodeKind::GlobalVar { namespace, name, .. } => {
                let text = format!(
                    "{}->getDefinition({}, {})",
                    REGISTRY,
                    php_string(&munge_ns(namespace)),
                    php_string(name.name())
                );
                self.emit_value(node, &text);
            }
            NodeKind::HostVar { name } => self.emit_value(node, &host_value(name)),
            NodeKind::HostClassName { name } => self.emit_value(node, name),
            NodeKind::Call { callee, args } => {
                self.context_prefix(node);
                self.emit_call(callee, args, loc);
                self.context_suffix(node);
            }
            NodeKind::MethodCall { target, method, args } => {
                self.context_prefix(node);
                self.emit_method_call(target, method, args, loc);
                self.context_suffix(node);
            }
            NodeKind::Fn { params, variadic, body, uses, frame } => {
                self.context_prefix(node);
                self.emit_fn(node, params, *variadic, body, uses, body.recurs_to(frame.id));
                self.context_suffix(node);
            }
            NodeKind::Do { stmts, ret } => self.emit_do(node, stmts, ret),
            NodeKind::If { test, then, otherwise } => self.emit_if(node, test, then, otherwise),
            NodeKind::Let { bindings, body, is_loop } => self.emit_let(node, bindings, body, *is_loop),
            NodeKind::Foreach { value_symbol, key_symbol, coll, body } => {
                self.emit_foreach(node, value_symbol, key_symbol.as_ref(), coll, body)
            }
            NodeKind::Try { body, catches, finally } => self.emit_try(node, body, catches, finally.as_deref()),
            NodeKind::Catch { class, symbol, body } => {
                self.out.emit_str(" catch (", loc);
                self.emit_node(class);
                self.out.emit_str(&format!(" {}", variable(symbol)), loc);
                self.out.emit_line(") {", loc);
                self.out.indent();
                self.emit_node(body);
                self.out.dedent();
                self.out.newline();
                self.out.emit_str("}", loc);
            }
            NodeKind::Throw { exception } => {
                let wrap = node.context() == EvalContext::Expression;
                if wrap {
                    self.fn_wrap_prefix(&node.env, loc);
                }
                self.out.emit_str("throw ", loc);
                self.emit_node(exception);
                self.out.emit_str(";", loc);
                if wrap {
                    self.fn_wrap_suffix(loc);
                }
            }
            NodeKind::Recur { frame, args, temps } => {
                assert_eq!(frame.arity(), args.len(), "recur arity was checked during analysis");
                for (temp, arg) in temps.iter().zip(args) {
                    self.out.emit_str(&format!("{} = ", variable(temp)), loc);
                    self.emit_node(arg);
                    self.out.emit_line(";", loc);
                }
                for (param, temp) in frame.params.iter().zip(temps) {
                    self.out.emit_line(&format!("{} = {};", variable(param), variable(temp)), loc);
                }
                self.out.emit_str("continue;", loc);
            }
            NodeKind::Def { namespace, name, meta, init } => self.emit_def(node, namespace, name, meta, init),
            NodeKind::Ns { namespace, requires } => {
                for required in requires {
                    self.out.emit_line(
                        &format!("{}->loadNs({});", RUNTIME, php_string(&munge_ns(required.name()))),
                        loc,
                    );
                }
                self.out.emit_line(
                    &format!(
                        "{}->addDefinition({}, \"*ns*\", {});",
                        REGISTRY,
                        php_string(CORE_NAMESPACE),
                        php_string(&munge_ns(namespace))
                    ),
                    loc,
                );
            }
            NodeKind::Vector { items } => {
                self.context_prefix(node);
                self.out.emit_str(&format!("{}->persistentVectorFromArray([", TYPE_FACTORY), loc);
                self.emit_args(items, loc);
                self.out.emit_str("])", loc);
                self.context_suffix(node);
            }
            NodeKind::Set { items } => {
                self.context_prefix(node);
                self.out.emit_str(&format!("{}->persistentHashSetFromArray([", TYPE_FACTORY), loc);
                self.emit_args(items, loc);
                self.out.emit_str("])", loc);
                self.context_suffix(node);
            }
            NodeKind::Array { items } => {
                self.context_prefix(node);
                self.out.emit_str("[", loc);
                self.emit_args(items, loc);
                self.out.emit_str("]", loc);
                self.context_suffix(node);
            }
            NodeKind::Table { entries } => {
                self.context_prefix(node);
                self.out.emit_str(&format!("{}->persistentMapFromKVs(", TYPE_FACTORY), loc);
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.emit_str(", ", loc);
                    }
                    self.emit_node(key);
                    self.out.emit_str(", ", loc);
                    self.emit_node(value);
                }
                self.out.emit_str(")", loc);
                self.context_suffix(node);
            }
            NodeKind::CollectionPush { target, value } => {
                self.context_prefix(node);
                self.emit_node(target);
                self.out.emit_str("[] = ", loc);
                self.emit_node(value);
                self.context_suffix(node);
            }
        }
    }

    //===------------------------------------------------------------------===//
    // Context & closure wrapping
    //===------------------------------------------------------------------===//

    fn context_prefix(&mut self, node: &Node) {
        if node.context() == EvalContext::Return {
            self.out.emit_str("return ", node.loc.as_ref());
        }
    }

    fn context_suffix(&mut self, node: &Node) {
        if node.context() != EvalContext::Expression {
            self.out.emit_str(";", node.loc.as_ref());
        }
    }

    fn emit_value(&mut self, node: &Node, text: &str) {
        self.context_prefix(node);
        self.out.emit_str(text, node.loc.as_ref());
        self.context_suffix(node);
    }

    /// `(function() use(&$a,&$b) {` followed by an indented line.
    fn fn_wrap_prefix(&mut self, env: &Env, loc: Option<&Location>) {
        self.out.emit_str("(function()", loc);
        let captured: Vec<String> = env.locals().map(|l| format!("&{}", variable(env.emitted_name(l)))).collect();
        if !captured.is_empty() {
            self.out.emit_str(&format!(" use({})", captured.join(",")), loc);
        }
        self.out.emit_line(" {", loc);
        self.out.indent();
    }

    fn fn_wrap_suffix(&mut self, loc: Option<&Location>) {
        self.out.dedent();
        self.out.newline();
        self.out.emit_str("})()", loc);
    }

    fn emit_args(&mut self, args: &[Node], loc: Option<&Location>) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.emit_str(", ", loc);
            }
            self.emit_node(arg);
        }
    }

    //===------------------------------------------------------------------===//
    // Calls
    //===------------------------------------------------------------------===//

    fn emit_call(&mut self, callee: &Node, args: &[Node], loc: Option<&Location>) {
        match &callee.kind {
            NodeKind::HostVar { name } if is_infix(name) && args.len() >= 2 => {
                self.out.emit_str("(", loc);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.emit_str(&format!(" {} ", name), loc);
                    }
                    self.emit_node(arg);
                }
                self.out.emit_str(")", loc);
            }
            NodeKind::HostVar { name } if is_prefix(name) && args.len() == 1 => {
                self.out.emit_str(&format!("({}", name), loc);
                self.emit_node(&args[0]);
                self.out.emit_str(")", loc);
            }
            NodeKind::HostVar { name } => {
                self.out.emit_str(&format!("{}(", name), callee.loc.as_ref().or(loc));
                self.emit_args(args, loc);
                self.out.emit_str(")", loc);
            }
            _ => {
                self.out.emit_str("(", loc);
                self.emit_node(callee);
                self.out.emit_str(")(", loc);
                self.emit_args(args, loc);
                self.out.emit_str(")", loc);
            }
        }
    }

    fn emit_method_call(&mut self, target: &Node, method: &str, args: &[Node], loc: Option<&Location>) {
        match &target.kind {
            NodeKind::HostClassName { name } => {
                self.out.emit_str(&format!("{}::{}(", name, munge(method)), loc);
            }
            _ => {
                self.out.emit_str("(", loc);
                self.emit_node(target);
                self.out.emit_str(&format!(")->{}(", munge(method)), loc);
            }
        }
        self.emit_args(args, loc);
        self.out.emit_str(")", loc);
    }

    //===------------------------------------------------------------------===//
    // Functions
    //===------------------------------------------------------------------===//

    fn emit_fn(
        &mut self,
        node: &Node,
        params: &[Symbol],
        variadic: bool,
        body: &Node,
        uses: &[Symbol],
        recurs: bool,
    ) {
        let loc = node.loc.as_ref();
        let captured: Vec<String> = uses.iter().map(|u| munge(node.env.emitted_name(u).name())).collect();

        let ctor_args = captured.iter().map(|name| format!("${}", name)).collect::<Vec<_>>().join(", ");
        self.out.emit_line(&format!("new class({}) extends \\Phel\\Lang\\AbstractFn {{", ctor_args), loc);
        self.out.indent();
        self.out.emit_line(&format!("public const BOUND_TO = {};", php_string(node.env.bound_to())), loc);

        if !captured.is_empty() {
            for name in &captured {
                self.out.emit_line(&format!("private ${};", name), loc);
            }
            self.out.newline();
            self.out.emit_line(&format!("public function __construct({}) {{", ctor_args), loc);
            self.out.indent();
            for name in &captured {
                self.out.emit_line(&format!("$this->{0} = ${0};", name), loc);
            }
            self.out.dedent();
            self.out.emit_line("}", loc);
        }
        self.out.newline();

        let param_list = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if variadic && i + 1 == params.len() {
                    format!("...{}", variable(p))
                } else {
                    variable(p)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.out.emit_line(&format!("public function __invoke({}) {{", param_list), loc);
        self.out.indent();

        if let (true, Some(rest)) = (variadic, params.last()) {
            let rest = variable(rest);
            self.out.emit_line(&format!("{0} = {1}->persistentVectorFromArray({0});", rest, TYPE_FACTORY), loc);
        }
        for name in &captured {
            self.out.emit_line(&format!("${0} = $this->{0};", name), loc);
        }

        if recurs {
            self.out.emit_line("while (true) {", loc);
            self.out.indent();
            self.emit_node(body);
            self.out.newline();
            self.out.emit_str("break;", loc);
            self.out.dedent();
            self.out.newline();
            self.out.emit_str("}", loc);
        } else {
            self.emit_node(body);
        }

        self.out.dedent();
        self.out.newline();
        self.out.emit_line("}", loc);
        self.out.dedent();
        self.out.emit_str("}", loc);
    }

    //===------------------------------------------------------------------===//
    // Control flow
    //===------------------------------------------------------------------===//

    fn emit_do(&mut self, node: &Node, stmts: &[Node], ret: &Node) {
        let loc = node.loc.as_ref();
        let wrap = !stmts.is_empty() && node.context() == EvalContext::Expression;
        if wrap {
            self.fn_wrap_prefix(&node.env, loc);
        }
        for stmt in stmts {
            self.emit_node(stmt);
            self.out.newline();
        }
        self.emit_node(ret);
        if wrap {
            self.fn_wrap_suffix(loc);
        }
    }

    fn emit_if(&mut self, node: &Node, test: &Node, then: &Node, otherwise: &Node) {
        let loc = node.loc.as_ref();
        if node.context() == EvalContext::Expression {
            self.out.emit_str(&format!("(({}(", TRUTHY), loc);
            self.emit_node(test);
            self.out.emit_str(")) ? ", loc);
            self.emit_node(then);
            self.out.emit_str(" : ", loc);
            self.emit_node(otherwise);
            self.out.emit_str(")", loc);
        } else {
            self.out.emit_str(&format!("if ({}(", TRUTHY), loc);
            self.emit_node(test);
            self.out.emit_line(")) {", loc);
            self.out.indent();
            self.emit_node(then);
            self.out.dedent();
            self.out.newline();
            self.out.emit_line("} else {", loc);
            self.out.indent();
            self.emit_node(otherwise);
            self.out.dedent();
            self.out.newline();
            self.out.emit_str("}", loc);
        }
    }

    fn emit_let(&mut self, node: &Node, bindings: &[Binding], body: &Node, is_loop: bool) {
        let loc = node.loc.as_ref();
        let wrap = node.context() == EvalContext::Expression && (!bindings.is_empty() || is_loop);
        if wrap {
            self.fn_wrap_prefix(&node.env, loc);
        }

        for binding in bindings {
            let binding_loc = binding.loc.as_ref().or(loc);
            self.out.emit_str(&format!("{} = ", variable(&binding.shadow)), binding_loc);
            self.emit_node(&binding.init);
            self.out.emit_line(";", binding_loc);
        }

        if is_loop {
            self.out.emit_line("while (true) {", loc);
            self.out.indent();
        }
        self.emit_node(body);
        if is_loop {
            self.out.newline();
            self.out.emit_str("break;", loc);
            self.out.dedent();
            self.out.newline();
            self.out.emit_str("}", loc);
        }

        if wrap {
            self.fn_wrap_suffix(loc);
        }
    }

    fn emit_foreach(
        &mut self,
        node: &Node,
        value_symbol: &Symbol,
        key_symbol: Option<&Symbol>,
        coll: &Node,
        body: &Node,
    ) {
        let loc = node.loc.as_ref();
        let context = node.context();
        if context == EvalContext::Expression {
            self.fn_wrap_prefix(&node.env, loc);
        }

        self.out.emit_str("foreach ((", loc);
        self.emit_node(coll);
        self.out.emit_str(" ?? []) as ", loc);
        if let Some(key) = key_symbol {
            self.out.emit_str(&format!("{} => ", variable(key)), loc);
        }
        self.out.emit_line(&format!("{}) {{", variable(value_symbol)), loc);
        self.out.indent();
        self.emit_node(body);
        self.out.dedent();
        self.out.newline();
        self.out.emit_str("}", loc);

        match context {
            EvalContext::Expression => {
                self.out.newline();
                self.out.emit_str("return null;", loc);
                self.fn_wrap_suffix(loc);
            }
            EvalContext::Return => {
                self.out.newline();
                self.out.emit_str("return null;", loc);
            }
            EvalContext::Statement => {}
        }
    }

    fn emit_try(&mut self, node: &Node, body: &Node, catches: &[Node], finally: Option<&Node>) {
        if catches.is_empty() && finally.is_none() {
            self.emit_node(body);
            return;
        }

        let loc = node.loc.as_ref();
        let wrap = node.context() == EvalContext::Expression;
        if wrap {
            self.fn_wrap_prefix(&node.env, loc);
        }

        self.out.emit_line("try {", loc);
        self.out.indent();
        self.emit_node(body);
        self.out.dedent();
        self.out.newline();
        self.out.emit_str("}", loc);

        for catch in catches {
            self.emit_node(catch);
        }

        if let Some(finally) = finally {
            let finally_loc = finally.loc.as_ref().or(loc);
            self.out.emit_line(" finally {", finally_loc);
            self.out.indent();
            self.emit_node(finally);
            self.out.dedent();
            self.out.newline();
            self.out.emit_str("}", finally_loc);
        }

        if wrap {
            self.fn_wrap_suffix(loc);
        }
    }

    //===------------------------------------------------------------------===//
    // Definitions
    //===------------------------------------------------------------------===//

    fn emit_def(&mut self, node: &Node, namespace: &str, name: &Symbol, meta: &Node, init: &Node) {
        let loc = node.loc.as_ref();
        self.context_prefix(node);
        self.out.emit_line(&format!("{}->addDefinition(", REGISTRY), loc);
        self.out.indent();
        self.out.emit_line(&format!("{},", php_string(&munge_ns(namespace))), loc);
        self.out.emit_line(&format!("{},", php_string(name.name())), loc);
        self.emit_node(init);
        self.out.emit_line(",", loc);
        match &meta.kind {
            NodeKind::Table { entries } if entries.is_empty() => self.out.emit_str("null", loc),
            _ => self.emit_node(meta),
        }
        self.out.dedent();
        self.out.newline();
        self.out.emit_str(")", loc);
        self.context_suffix(node);
    }
}

//===----------------------------------------------------------------------===//
// Helpers
//===----------------------------------------------------------------------===//

fn variable(sym: &Symbol) -> String {
    format!("${}", munge(sym.name()))
}

/// A host function used as a value rather than called.
fn host_value(name: &str) -> String {
    let constant_like = name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '\\');
    if constant_like {
        name.to_string()
    } else if is_infix(name) {
        format!("(function($a, $b) {{ return $a {} $b; }})", name)
    } else {
        format!("(function(...$args) {{ return {}(...$args); }})", name)
    }
}
