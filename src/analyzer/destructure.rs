//! Rewrites binding patterns into plain `name init` pairs.
//!
//! A pattern bound to the symbol `src` becomes one pair per element, each
//! reading from `src` through a host method call:
//!
//! ```text
//! [a b & r]      =>  a (.get src 0)  b (.get src 1)  r (.slice src 2)
//! {:k a "s" b}   =>  a (.get src :k) b (.get src "s")
//! {:keys [x y]}  =>  x (.get src :x) y (.get src :y)
//! ```
//!
//! Nested patterns are left in target position; the `let` that receives
//! the pairs binds them to a fresh symbol and destructures again.

use super::invalid_form;
use crate::error::SpannedResult;
use crate::form::{Form, Location, Symbol};

pub(super) fn destructure(pattern: &Form, src: &Symbol) -> SpannedResult<Vec<Form>> {
    let loc = pattern.loc();
    match pattern {
        Form::Vector { items, .. } => vector_pattern(items, src, loc),
        Form::Map { entries, .. } => map_pattern(entries, src, loc),
        other => Err(invalid_form(loc, format!("Can not destructure {}", other.type_name()))),
    }
}

fn vector_pattern(items: &[Form], src: &Symbol, loc: Option<&Location>) -> SpannedResult<Vec<Form>> {
    let mut pairs = Vec::with_capacity(items.len() * 2);
    let mut index = 0;
    while index < items.len() {
        let item = &items[index];
        if item.is_symbol_named("&") {
            let rest = &items[index + 1..];
            if rest.len() != 1 {
                return Err(invalid_form(
                    item.loc().or(loc),
                    "Unsupported destructuring form, only one binding can follow the & parameter",
                ));
            }
            pairs.push(rest[0].clone());
            pairs.push(method_call("slice", src, Form::int(index as i64), loc));
            break;
        }
        pairs.push(item.clone());
        pairs.push(method_call("get", src, Form::int(index as i64), loc));
        index += 1;
    }
    Ok(pairs)
}

fn map_pattern(entries: &[(Form, Form)], src: &Symbol, loc: Option<&Location>) -> SpannedResult<Vec<Form>> {
    let mut pairs = Vec::with_capacity(entries.len() * 2);
    for (key, binding) in entries {
        if matches!(key, Form::Keyword { value, .. } if value.ns.is_none() && &*value.name == "keys") {
            let Form::Vector { items, .. } = binding else {
                return Err(invalid_form(binding.loc().or(loc), ":keys expects a vector of symbols"));
            };
            for item in items {
                let Some(sym) = item.as_symbol() else {
                    return Err(invalid_form(item.loc().or(loc), ":keys expects a vector of symbols"));
                };
                pairs.push(item.clone());
                pairs.push(method_call("get", src, Form::keyword(sym.name()), loc));
            }
            continue;
        }
        pairs.push(binding.clone());
        pairs.push(method_call("get", src, key.clone(), loc));
    }
    Ok(pairs)
}

/// `(.method src arg)`
fn method_call(method: &str, src: &Symbol, arg: Form, loc: Option<&Location>) -> Form {
    Form::list(vec![
        Form::symbol(&format!(".{}", method)),
        Form::from_symbol(src.clone()),
        arg,
    ])
    .with_loc(loc.cloned())
}
