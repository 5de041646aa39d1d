use crate::form::Symbol;

pub const GENSYM_PREFIX: &str = "__phel_";

/// Hands out unique symbol names for one analyzer run.
///
/// The counter is shared by every kind of generated name (destructuring
/// temporaries, shadowed locals, recur temporaries, frame ids), so two
/// generated names never collide even when their prefixes do.
#[derive(Debug, Clone, Default)]
pub struct SymbolGenerator {
    counter: u64,
}

impl SymbolGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// `__phel_N`
    pub fn gen(&mut self) -> Symbol {
        self.gen_with_prefix(GENSYM_PREFIX)
    }

    /// `<prefix>N`
    pub fn gen_with_prefix(&mut self, prefix: &str) -> Symbol {
        let id = self.next_id();
        Symbol::new(format!("{}{}", prefix, id))
    }

    /// Resets numbering, for reproducible output across runs.
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
