use std::fmt;
use std::sync::Arc;

use im::{OrdMap, OrdSet, Vector};

use crate::core::RecurFrame;
use crate::form::Symbol;

/// How the value of a node is consumed by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalContext {
    /// The value is used in place.
    Expression,
    /// Only the side effects matter.
    Statement,
    /// The value is returned from the enclosing function body.
    Return,
}

impl fmt::Display for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalContext::Expression => write!(f, "expression"),
            EvalContext::Statement => write!(f, "statement"),
            EvalContext::Return => write!(f, "return"),
        }
    }
}

//===----------------------------------------------------------------------===//
// Env
//
// The lexical context threaded through analysis. Every `with_*` method
// returns a new value; the persistent collections make those copies cheap
// and let sibling calls share the same parent env.
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq)]
pub struct Env {
    locals: OrdSet<Symbol>,
    shadowed: OrdMap<Arc<str>, Symbol>,
    context: EvalContext,
    recur_frames: Vector<Option<RecurFrame>>,
    bound_to: Arc<str>,
    def_allowed: bool,
}

impl Default for Env {
    fn default() -> Self {
        Self::empty()
    }
}

impl Env {
    /// No locals, statement context, no recur frames, `def` allowed.
    pub fn empty() -> Self {
        Self {
            locals: OrdSet::new(),
            shadowed: OrdMap::new(),
            context: EvalContext::Statement,
            recur_frames: Vector::new(),
            bound_to: Arc::from(""),
            def_allowed: true,
        }
    }

    pub fn context(&self) -> EvalContext {
        self.context
    }

    pub fn locals(&self) -> impl Iterator<Item = &Symbol> {
        self.locals.iter()
    }

    pub fn has_local(&self, sym: &Symbol) -> bool {
        sym.ns.is_none() && self.locals.contains(sym)
    }

    /// Code-generation name for a local, if it was shadowed.
    pub fn shadowed(&self, sym: &Symbol) -> Option<&Symbol> {
        self.shadowed.get(&sym.name)
    }

    pub fn is_shadowed(&self, sym: &Symbol) -> bool {
        self.shadowed.contains_key(&sym.name)
    }

    /// The name a local must be emitted under.
    pub fn emitted_name<'a>(&'a self, sym: &'a Symbol) -> &'a Symbol {
        self.shadowed(sym).unwrap_or(sym)
    }

    pub fn bound_to(&self) -> &str {
        &self.bound_to
    }

    pub fn is_def_allowed(&self) -> bool {
        self.def_allowed
    }

    /// The innermost frame. `None` when there is no frame or when the
    /// topmost entry is a boundary.
    pub fn current_recur_frame(&self) -> Option<&RecurFrame> {
        self.recur_frames.last().and_then(|frame| frame.as_ref())
    }

    //===------------------------------------------------------------------===//
    // Derivations
    //===------------------------------------------------------------------===//

    pub fn with_context(&self, context: EvalContext) -> Self {
        Self { context, ..self.clone() }
    }

    /// Adds `locals`, dropping any shadow entry they had: a fresh binding
    /// of a name hides the older shadowed one.
    pub fn with_merged_locals<'a>(&self, locals: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let mut next = self.clone();
        for local in locals {
            let local = local.unqualified();
            next.shadowed.remove(&local.name);
            next.locals.insert(local);
        }
        next
    }

    pub fn with_shadowed_local(&self, local: &Symbol, shadow: Symbol) -> Self {
        let mut next = self.clone();
        next.shadowed.insert(local.name.clone(), shadow);
        next
    }

    pub fn with_recur_frame(&self, frame: RecurFrame) -> Self {
        let mut next = self.clone();
        next.recur_frames.push_back(Some(frame));
        next
    }

    /// Pushes a boundary: `recur` is invalid until it is popped.
    pub fn with_disallowed_recur_frame(&self) -> Self {
        let mut next = self.clone();
        next.recur_frames.push_back(None);
        next
    }

    pub fn with_bound_to(&self, bound_to: impl Into<Arc<str>>) -> Self {
        Self { bound_to: bound_to.into(), ..self.clone() }
    }

    pub fn with_def_allowed(&self, def_allowed: bool) -> Self {
        Self { def_allowed, ..self.clone() }
    }

    /// Shorthand for the env of a value position: expression context
    /// behind a recur boundary.
    pub fn as_operand(&self) -> Self {
        self.with_context(EvalContext::Expression).with_disallowed_recur_frame()
    }
}
