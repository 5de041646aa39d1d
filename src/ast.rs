use std::sync::Arc;

use crate::core::{Meta, RecurFrame};
use crate::env::{Env, EvalContext};
use crate::form::{Form, Location, Symbol};

//===----------------------------------------------------------------------===//
// Node
//
// The analyzed program. Each node keeps the env it was analyzed under: the
// emitter reads the evaluation context from there to decide the code shape,
// and the locals to build closure `use` lists.
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub env: Env,
    pub loc: Option<Location>,
    pub kind: NodeKind,
}

/// One `name init` pair of a `let` or `loop`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub symbol: Symbol,
    /// Unique name the binding is emitted under.
    pub shadow: Symbol,
    pub init: Node,
    pub loc: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Scalars, nil, keywords and the empty list.
    Literal { value: Form },
    LocalVar { name: Symbol },
    GlobalVar { namespace: Arc<str>, name: Symbol, meta: Meta },
    /// A PHP function or constant, `php/strlen`.
    HostVar { name: Arc<str> },
    /// A fully-qualified PHP class name, always with a leading backslash.
    HostClassName { name: Arc<str> },
    Call { callee: Box<Node>, args: Vec<Node> },
    MethodCall { target: Box<Node>, method: Arc<str>, args: Vec<Node> },
    Fn {
        params: Vec<Symbol>,
        variadic: bool,
        body: Box<Node>,
        /// Outer locals captured by the closure.
        uses: Vec<Symbol>,
        frame: RecurFrame,
    },
    Do { stmts: Vec<Node>, ret: Box<Node> },
    If { test: Box<Node>, then: Box<Node>, otherwise: Box<Node> },
    Let { bindings: Vec<Binding>, body: Box<Node>, is_loop: bool },
    Foreach {
        value_symbol: Symbol,
        key_symbol: Option<Symbol>,
        coll: Box<Node>,
        body: Box<Node>,
    },
    Try { body: Box<Node>, catches: Vec<Node>, finally: Option<Box<Node>> },
    Catch { class: Box<Node>, symbol: Symbol, body: Box<Node> },
    Throw { exception: Box<Node> },
    Recur { frame: RecurFrame, args: Vec<Node>, temps: Vec<Symbol> },
    Quote { value: Form },
    Def { namespace: Arc<str>, name: Symbol, meta: Box<Node>, init: Box<Node> },
    Ns { namespace: Arc<str>, requires: Vec<Symbol> },
    Vector { items: Vec<Node> },
    Array { items: Vec<Node> },
    Table { entries: Vec<(Node, Node)> },
    Set { items: Vec<Node> },
    CollectionPush { target: Box<Node>, value: Box<Node> },
}

impl Node {
    pub fn new(env: &Env, loc: Option<Location>, kind: NodeKind) -> Self {
        Self { env: env.clone(), loc, kind }
    }

    pub fn context(&self) -> EvalContext {
        self.env.context()
    }

    /// Re-targets this node to `context`, along with the branches that
    /// inherit it (`if` arms, a bare `do` return).
    pub fn with_context(&self, context: EvalContext) -> Self {
        let kind = match &self.kind {
            NodeKind::If { test, then, otherwise } => NodeKind::If {
                test: test.clone(),
                then: Box::new(then.with_context(context)),
                otherwise: Box::new(otherwise.with_context(context)),
            },
            NodeKind::Do { stmts, ret } if stmts.is_empty() => {
                NodeKind::Do { stmts: vec![], ret: Box::new(ret.with_context(context)) }
            }
            other => other.clone(),
        };
        Node { env: self.env.with_context(context), loc: self.loc.clone(), kind }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Literal { .. } => "Literal",
            NodeKind::LocalVar { .. } => "LocalVar",
            NodeKind::GlobalVar { .. } => "GlobalVar",
            NodeKind::HostVar { .. } => "HostVar",
            NodeKind::HostClassName { .. } => "HostClassName",
            NodeKind::Call { .. } => "Call",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::Fn { .. } => "Fn",
            NodeKind::Do { .. } => "Do",
            NodeKind::If { .. } => "If",
            NodeKind::Let { is_loop: true, .. } => "Loop",
            NodeKind::Let { .. } => "Let",
            NodeKind::Foreach { .. } => "Foreach",
            NodeKind::Try { .. } => "Try",
            NodeKind::Catch { .. } => "Catch",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Recur { .. } => "Recur",
            NodeKind::Quote { .. } => "Quote",
            NodeKind::Def { .. } => "Def",
            NodeKind::Ns { .. } => "Ns",
            NodeKind::Vector { .. } => "Vector",
            NodeKind::Array { .. } => "Array",
            NodeKind::Table { .. } => "Table",
            NodeKind::Set { .. } => "Set",
            NodeKind::CollectionPush { .. } => "CollectionPush",
        }
    }

    /// Direct sub-nodes, in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Literal { .. }
            | NodeKind::LocalVar { .. }
            | NodeKind::GlobalVar { .. }
            | NodeKind::HostVar { .. }
            | NodeKind::HostClassName { .. }
            | NodeKind::Quote { .. }
            | NodeKind::Ns { .. } => vec![],
            NodeKind::Call { callee, args } => {
                std::iter::once(callee.as_ref()).chain(args.iter()).collect()
            }
            NodeKind::MethodCall { target, args, .. } => {
                std::iter::once(target.as_ref()).chain(args.iter()).collect()
            }
            NodeKind::Fn { body, .. } => vec![body.as_ref()],
            NodeKind::Do { stmts, ret } => stmts.iter().chain(std::iter::once(ret.as_ref())).collect(),
            NodeKind::If { test, then, otherwise } => {
                vec![test.as_ref(), then.as_ref(), otherwise.as_ref()]
            }
            NodeKind::Let { bindings, body, .. } => {
                bindings.iter().map(|b| &b.init).chain(std::iter::once(body.as_ref())).collect()
            }
            NodeKind::Foreach { coll, body, .. } => vec![coll.as_ref(), body.as_ref()],
            NodeKind::Try { body, catches, finally } => std::iter::once(body.as_ref())
                .chain(catches.iter())
                .chain(finally.as_deref())
                .collect(),
            NodeKind::Catch { class, body, .. } => vec![class.as_ref(), body.as_ref()],
            NodeKind::Throw { exception } => vec![exception.as_ref()],
            NodeKind::Recur { args, .. } => args.iter().collect(),
            NodeKind::Def { meta, init, .. } => vec![meta.as_ref(), init.as_ref()],
            NodeKind::Vector { items } | NodeKind::Array { items } | NodeKind::Set { items } => {
                items.iter().collect()
            }
            NodeKind::Table { entries } => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            NodeKind::CollectionPush { target, value } => vec![target.as_ref(), value.as_ref()],
        }
    }

    /// Whether a `recur` anywhere below targets the frame `frame_id`.
    pub fn recurs_to(&self, frame_id: u64) -> bool {
        match &self.kind {
            NodeKind::Recur { frame, args, .. } => {
                frame.id == frame_id || args.iter().any(|a| a.recurs_to(frame_id))
            }
            _ => self.children().into_iter().any(|child| child.recurs_to(frame_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(env: &Env, value: Form) -> Node {
        Node::new(env, None, NodeKind::Literal { value })
    }

    #[test]
    fn with_context_retargets_if_arms_only() {
        let env = Env::empty().with_context(EvalContext::Expression);
        let node = Node::new(
            &env,
            None,
            NodeKind::If {
                test: Box::new(literal(&env, Form::bool(true))),
                then: Box::new(literal(&env, Form::int(1))),
                otherwise: Box::new(literal(&env, Form::int(2))),
            },
        );

        let stmt = node.with_context(EvalContext::Statement);
        assert_eq!(stmt.context(), EvalContext::Statement);
        match &stmt.kind {
            NodeKind::If { test, then, otherwise } => {
                assert_eq!(test.context(), EvalContext::Expression);
                assert_eq!(then.context(), EvalContext::Statement);
                assert_eq!(otherwise.context(), EvalContext::Statement);
            }
            _ => panic!("Expected NodeKind::If"),
        }
    }

    #[test]
    fn recurs_to_finds_nested_recur() {
        let env = Env::empty();
        let frame = RecurFrame::new(7, vec![Symbol::new("x")]);
        let recur = Node::new(
            &env,
            None,
            NodeKind::Recur {
                frame: frame.clone(),
                args: vec![literal(&env, Form::int(1))],
                temps: vec![Symbol::new("__phel_1")],
            },
        );
        let body = Node::new(&env, None, NodeKind::Do { stmts: vec![], ret: Box::new(recur) });

        assert!(body.recurs_to(7));
        assert!(!body.recurs_to(8));
    }
}
