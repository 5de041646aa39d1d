//! Macros and inline functions of `phel\core` that ship with the compiler.
//!
//! Each expander receives the raw argument forms of the call and returns
//! the replacement form; the analyzer takes it from there.

use std::sync::Arc;

use tracing::trace;

use crate::core::metadata::{ArityFn, ExpandFn, Meta};
use crate::core::namespace::{GlobalTable, CORE_NAMESPACE};
use crate::form::Form;

type Expander = fn(&[Form]) -> Result<Form, String>;

const MACROS: &[(&str, &str, Expander)] = &[
    ("defn", "Defines a global function.", expand_defn),
    ("when", "Evaluates the body when the test is truthy.", expand_when),
    ("when-not", "Evaluates the body when the test is falsy.", expand_when_not),
    ("if-not", "Like `if` with the branches swapped.", expand_if_not),
    ("cond", "Takes test/expression pairs and evaluates the first truthy one.", expand_cond),
    ("->", "Threads a value through forms as their first argument.", expand_thread_first),
    ("->>", "Threads a value through forms as their last argument.", expand_thread_last),
    ("comment", "Ignores the body and yields nil.", expand_comment),
];

/// Binary host operators, inlined when called with two arguments.
const BINARY_OPS: &[(&str, &str)] = &[
    ("+", "+"),
    ("-", "-"),
    ("*", "*"),
    ("/", "/"),
    ("<", "<"),
    (">", ">"),
    ("<=", "<="),
    (">=", ">="),
    ("=", "=="),
    ("str", "."),
];

/// Registers the prelude into `globals`, under `phel\core`.
pub fn install(globals: &mut GlobalTable) {
    for (name, doc, expander) in MACROS {
        let expander: ExpandFn = Arc::new(*expander);
        globals.register_macro(CORE_NAMESPACE, name, Meta::new().with("doc", Form::string(*doc)), expander);
    }

    for (name, op) in BINARY_OPS {
        let host_op = format!("php/{}", op);
        let inline: ExpandFn = Arc::new(move |args: &[Form]| {
            let [a, b] = args else {
                return Err(format!("expected two arguments, got {}", args.len()));
            };
            Ok(Form::list(vec![Form::symbol(&host_op), a.clone(), b.clone()]))
        });
        let arity: ArityFn = Arc::new(|argc| argc == 2);
        globals.register_inline(CORE_NAMESPACE, name, Meta::new(), inline, Some(arity));
    }

    let not: ExpandFn = Arc::new(|args: &[Form]| match args {
        [value] => Ok(Form::list(vec![
            Form::symbol("if"),
            value.clone(),
            Form::bool(false),
            Form::bool(true),
        ])),
        _ => Err(format!("expected one argument, got {}", args.len())),
    });
    globals.register_inline(CORE_NAMESPACE, "not", Meta::new(), not, Some(Arc::new(|argc| argc == 1)));

    trace!(target: "phelc::prelude", macros = MACROS.len(), inlines = BINARY_OPS.len() + 1, "prelude installed");
}

//===----------------------------------------------------------------------===//
// Macro expanders
//===----------------------------------------------------------------------===//

/// (defn name "doc"? [params] body...) => (def name "doc"? (fn [params] body...))
fn expand_defn(args: &[Form]) -> Result<Form, String> {
    let Some((name, rest)) = args.split_first() else {
        return Err("defn requires a name".to_string());
    };
    if name.as_symbol().is_none() {
        return Err(format!("defn expects a symbol as name, got {}", name.type_name()));
    }

    let (doc, rest) = match rest {
        [doc @ Form::Str { .. }, rest @ ..] if !rest.is_empty() => (Some(doc), rest),
        _ => (None, rest),
    };
    if !matches!(rest.first(), Some(Form::Vector { .. })) {
        return Err("defn expects a parameter vector".to_string());
    }

    let mut fn_form = vec![Form::symbol("fn")];
    fn_form.extend_from_slice(rest);

    let mut def = vec![Form::symbol("def"), name.clone()];
    def.extend(doc.cloned());
    def.push(Form::list(fn_form));
    Ok(Form::list(def))
}

fn expand_when(args: &[Form]) -> Result<Form, String> {
    let (test, body) = args.split_first().ok_or("when requires a test")?;
    Ok(Form::list(vec![Form::symbol("if"), test.clone(), do_block(body)]))
}

fn expand_when_not(args: &[Form]) -> Result<Form, String> {
    let (test, body) = args.split_first().ok_or("when-not requires a test")?;
    Ok(Form::list(vec![Form::symbol("if"), test.clone(), Form::nil(), do_block(body)]))
}

fn expand_if_not(args: &[Form]) -> Result<Form, String> {
    match args {
        [test, then] => Ok(Form::list(vec![Form::symbol("if"), test.clone(), Form::nil(), then.clone()])),
        [test, then, otherwise] => Ok(Form::list(vec![
            Form::symbol("if"),
            test.clone(),
            otherwise.clone(),
            then.clone(),
        ])),
        _ => Err(format!("if-not requires two or three arguments, got {}", args.len())),
    }
}

/// (cond t1 e1 t2 e2) => (if t1 e1 (if t2 e2 nil))
fn expand_cond(args: &[Form]) -> Result<Form, String> {
    if args.len() % 2 != 0 {
        return Err("cond requires an even number of forms".to_string());
    }
    Ok(args.chunks(2).rev().fold(Form::nil(), |otherwise, pair| {
        Form::list(vec![Form::symbol("if"), pair[0].clone(), pair[1].clone(), otherwise])
    }))
}

fn expand_thread_first(args: &[Form]) -> Result<Form, String> {
    thread(args, "->", |head, rest, acc| {
        let mut items = vec![head];
        items.push(acc);
        items.extend(rest);
        items
    })
}

fn expand_thread_last(args: &[Form]) -> Result<Form, String> {
    thread(args, "->>", |head, rest, acc| {
        let mut items = vec![head];
        items.extend(rest);
        items.push(acc);
        items
    })
}

fn thread(
    args: &[Form],
    name: &str,
    place: impl Fn(Form, Vec<Form>, Form) -> Vec<Form>,
) -> Result<Form, String> {
    let (init, steps) = args.split_first().ok_or_else(|| format!("{} requires an initial value", name))?;
    Ok(steps.iter().fold(init.clone(), |acc, step| match step {
        Form::List { items, loc } if !items.is_empty() => {
            let rest = items[1..].to_vec();
            Form::list(place(items[0].clone(), rest, acc)).with_loc(loc.clone())
        }
        other => Form::list(place(other.clone(), vec![], acc)),
    }))
}

fn expand_comment(_: &[Form]) -> Result<Form, String> {
    Ok(Form::nil())
}

fn do_block(body: &[Form]) -> Form {
    let mut items = Vec::with_capacity(body.len() + 1);
    items.push(Form::symbol("do"));
    items.extend_from_slice(body);
    Form::list(items)
}
