use crate::form::Symbol;

/// A tail-jump target pushed by `fn` and `loop`.
///
/// `params` are the names a `recur` rebinds, already shadow-resolved, so the
/// emitter can assign them directly. `id` is unique within one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurFrame {
    pub id: u64,
    pub params: Vec<Symbol>,
}

impl RecurFrame {
    pub fn new(id: u64, params: Vec<Symbol>) -> Self {
        Self { id, params }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
