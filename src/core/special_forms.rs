use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::form::Symbol;

/// Forms with fixed translation rules. Their heads are never resolved as
/// symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Def,
    Do,
    Fn,
    Foreach,
    If,
    Let,
    Loop,
    Ns,
    Quote,
    Recur,
    Throw,
    Try,
    ArrayPush,
}

static SPECIAL_FORMS: Lazy<FxHashMap<&'static str, SpecialForm>> = Lazy::new(|| {
    let mut forms = FxHashMap::default();
    forms.insert("def", SpecialForm::Def);
    forms.insert("do", SpecialForm::Do);
    forms.insert("fn", SpecialForm::Fn);
    forms.insert("foreach", SpecialForm::Foreach);
    forms.insert("if", SpecialForm::If);
    forms.insert("let", SpecialForm::Let);
    forms.insert("loop", SpecialForm::Loop);
    forms.insert("ns", SpecialForm::Ns);
    forms.insert("quote", SpecialForm::Quote);
    forms.insert("recur", SpecialForm::Recur);
    forms.insert("throw", SpecialForm::Throw);
    forms.insert("try", SpecialForm::Try);
    forms.insert("php/apush", SpecialForm::ArrayPush);
    forms
});

impl SpecialForm {
    pub fn from_symbol(sym: &Symbol) -> Option<Self> {
        match sym.namespace() {
            None => SPECIAL_FORMS.get(sym.name()).copied(),
            Some("php") => SPECIAL_FORMS.get(sym.to_string().as_str()).copied(),
            Some(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpecialForm::Def => "def",
            SpecialForm::Do => "do",
            SpecialForm::Fn => "fn",
            SpecialForm::Foreach => "foreach",
            SpecialForm::If => "if",
            SpecialForm::Let => "let",
            SpecialForm::Loop => "loop",
            SpecialForm::Ns => "ns",
            SpecialForm::Quote => "quote",
            SpecialForm::Recur => "recur",
            SpecialForm::Throw => "throw",
            SpecialForm::Try => "try",
            SpecialForm::ArrayPush => "php/apush",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_only_registered_heads() {
        assert_eq!(SpecialForm::from_symbol(&Symbol::new("fn")), Some(SpecialForm::Fn));
        assert_eq!(SpecialForm::from_symbol(&Symbol::parse("php/apush")), Some(SpecialForm::ArrayPush));
        assert_eq!(SpecialForm::from_symbol(&Symbol::parse("user/fn")), None);
        assert_eq!(SpecialForm::from_symbol(&Symbol::new("defn")), None);
    }
}
