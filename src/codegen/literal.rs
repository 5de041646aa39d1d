//! PHP renderings of literal values and quoted forms.

use itertools::Itertools;

use super::munge::munge_ns;
use crate::form::{Form, Keyword, Symbol};

pub(super) const TYPE_FACTORY: &str = "\\Phel\\Lang\\TypeFactory::getInstance()";

/// A PHP double-quoted string literal.
pub fn php_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{1b}' => out.push_str("\\e"),
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Floats always carry a decimal point so PHP reads them back as floats.
pub fn php_float(value: f64) -> String {
    if value.is_nan() {
        "NAN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        let text = value.to_string();
        if text.contains('.') || text.contains('e') {
            text
        } else {
            format!("{}.0", text)
        }
    }
}

pub fn php_keyword(keyword: &Keyword) -> String {
    match &keyword.ns {
        Some(ns) => format!(
            "\\Phel\\Lang\\Keyword::createForNamespace({}, {})",
            php_string(&munge_ns(ns)),
            php_string(&keyword.name)
        ),
        None => format!("\\Phel\\Lang\\Keyword::create({})", php_string(&keyword.name)),
    }
}

pub fn php_symbol(symbol: &Symbol) -> String {
    match &symbol.ns {
        Some(ns) => format!(
            "\\Phel\\Lang\\Symbol::createForNamespace({}, {})",
            php_string(ns),
            php_string(&symbol.name)
        ),
        None => format!("\\Phel\\Lang\\Symbol::create({})", php_string(&symbol.name)),
    }
}

/// The runtime value of `form` as data: symbols stay symbols and lists
/// become persistent lists instead of calls.
pub fn quoted(form: &Form) -> String {
    match form {
        Form::Nil { .. } => "null".to_string(),
        Form::Bool { value, .. } => value.to_string(),
        Form::Int { value, .. } => value.to_string(),
        Form::Float { value, .. } => php_float(*value),
        Form::Str { value, .. } => php_string(value),
        Form::Keyword { value, .. } => php_keyword(value),
        Form::Symbol { value, .. } => php_symbol(value),
        Form::List { items, .. } => {
            format!("{}->persistentListFromArray([{}])", TYPE_FACTORY, items.iter().map(quoted).join(", "))
        }
        Form::Vector { items, .. } => {
            format!("{}->persistentVectorFromArray([{}])", TYPE_FACTORY, items.iter().map(quoted).join(", "))
        }
        Form::Array { items, .. } => format!("[{}]", items.iter().map(quoted).join(", ")),
        Form::Set { items, .. } => {
            format!("{}->persistentHashSetFromArray([{}])", TYPE_FACTORY, items.iter().map(quoted).join(", "))
        }
        Form::Map { entries, .. } => format!(
            "{}->persistentMapFromKVs({})",
            TYPE_FACTORY,
            entries.iter().flat_map(|(k, v)| [quoted(k), quoted(v)]).join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_escape_php_specials() {
        assert_eq!(php_string("a\"b"), r#""a\"b""#);
        assert_eq!(php_string("$x\n"), r#""\$x\n""#);
        assert_eq!(php_string("a\\b"), r#""a\\b""#);
        assert_eq!(php_string("\u{1}"), r#""\x01""#);
    }

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(php_float(1.0), "1.0");
        assert_eq!(php_float(1.5), "1.5");
        assert_eq!(php_float(-3.0), "-3.0");
    }

    #[test]
    fn quoted_list_is_data() {
        let form = Form::list(vec![Form::symbol("f"), Form::int(1), Form::keyword("k")]);
        assert_eq!(
            quoted(&form),
            "\\Phel\\Lang\\TypeFactory::getInstance()->persistentListFromArray(\
             [\\Phel\\Lang\\Symbol::create(\"f\"), 1, \\Phel\\Lang\\Keyword::create(\"k\")])"
        );
    }
}
