//! Tests for form analysis: resolution, special forms and their errors.

use phelc::analyzer::Analyzer;
use phelc::ast::{Node, NodeKind};
use phelc::core::Meta;
use phelc::env::{Env, EvalContext};
use phelc::form::{Form, Symbol};
use phelc::reader;

fn read(src: &str) -> Form {
    reader::read(src).unwrap_or_else(|err| panic!("failed to read `{}`: {}", src, err))
}

fn analyze_in(analyzer: &mut Analyzer, src: &str, env: &Env) -> Node {
    analyzer
        .analyze(&read(src), env)
        .unwrap_or_else(|err| panic!("failed to analyze `{}`: {}", src, err))
}

fn analyze(src: &str) -> Node {
    analyze_in(&mut Analyzer::with_prelude(), src, &Env::empty())
}

fn analyze_err(src: &str) -> String {
    match Analyzer::with_prelude().analyze(&read(src), &Env::empty()) {
        Ok(node) => panic!("expected `{}` to fail, got {:?}", src, node.kind),
        Err(err) => err.message(),
    }
}

/// The return node of a body, looking through a bare `do`.
fn body_ret(node: &Node) -> &Node {
    match &node.kind {
        NodeKind::Do { stmts, ret } if stmts.is_empty() => body_ret(ret),
        _ => node,
    }
}

//===----------------------------------------------------------------------===//
// Literals & symbols
//===----------------------------------------------------------------------===//

#[test]
fn literals_analyze_to_themselves() {
    let env = Env::empty().with_context(EvalContext::Expression);
    for src in ["42", "1.5", "\"s\"", ":k", "nil", "true"] {
        let node = analyze_in(&mut Analyzer::default(), src, &env);
        assert_eq!(node.kind, NodeKind::Literal { value: read(src) });
        assert_eq!(node.env, env);
    }
}

#[test]
fn local_shadows_global() {
    let mut analyzer = Analyzer::default();
    analyzer.globals_mut().add_definition("user", "x", Meta::new());

    let global = analyze_in(&mut analyzer, "x", &Env::empty());
    assert!(matches!(global.kind, NodeKind::GlobalVar { ref namespace, .. } if &**namespace == "user"));

    let env = Env::empty().with_merged_locals([&Symbol::new("x")]);
    let local = analyze_in(&mut analyzer, "x", &env);
    assert_eq!(local.kind, NodeKind::LocalVar { name: Symbol::new("x") });
}

#[test]
fn unresolved_symbol_is_an_error() {
    assert_eq!(analyze_err("nope"), "Cannot resolve symbol 'nope'");
}

#[test]
fn php_symbols_are_host_vars() {
    assert_eq!(analyze("php/strlen").kind, NodeKind::HostVar { name: "strlen".into() });
    assert_eq!(analyze("\\DateTime").kind, NodeKind::HostClassName { name: "\\DateTime".into() });
}

#[test]
fn binary_host_operators_need_two_operands() {
    assert_eq!(analyze_err("(php/* 1)"), "Host operator '*' requires at least two arguments");
    assert_eq!(analyze_err("(php/< 1)"), "Host operator '<' requires at least two arguments");
    assert_eq!(analyze_err("(php/+)"), "Host operator '+' requires at least two arguments");
    assert!(matches!(analyze("(php/+ 1)").kind, NodeKind::Call { .. }));
    assert!(matches!(analyze("(php/- 1)").kind, NodeKind::Call { .. }));
}

//===----------------------------------------------------------------------===//
// fn
//===----------------------------------------------------------------------===//

#[test]
fn fn_argument_errors() {
    assert_eq!(analyze_err("(fn)"), "fn requires at least one argument");
    assert_eq!(analyze_err("(fn x)"), "Second argument of 'fn must be a vector");
    assert_eq!(
        analyze_err("(fn [& a b] a)"),
        "Unsupported parameter form, only one symbol can follow the & parameter"
    );
    assert_eq!(analyze_err("(fn [1x] 1)"), "Variable names must start with a letter or underscore: 1x");
    assert_eq!(
        analyze_err("(fn [&] 1)"),
        "Unsupported parameter form, only one symbol can follow the & parameter"
    );
}

#[test]
fn fn_accepts_underscore_and_dashed_params() {
    let node = analyze("(fn [_x x-1] x-1)");
    match &node.kind {
        NodeKind::Fn { params, body, .. } => {
            assert_eq!(params, &vec![Symbol::new("_x"), Symbol::new("x-1")]);
            assert_eq!(body_ret(body).kind, NodeKind::LocalVar { name: Symbol::new("x-1") });
        }
        other => panic!("expected fn, got {:?}", other),
    }
}

#[test]
fn fn_params_and_captures() {
    let node = analyze("(let [a 1] (fn [b & more] a))");
    let NodeKind::Let { body, .. } = &node.kind else { panic!("expected let, got {:?}", node.kind) };

    match &body_ret(body).kind {
        NodeKind::Fn { params, variadic, uses, body, .. } => {
            assert_eq!(params, &vec![Symbol::new("b"), Symbol::new("more")]);
            assert!(*variadic);
            assert_eq!(uses, &vec![Symbol::new("a")]);
            assert_eq!(body.context(), EvalContext::Return);
        }
        other => panic!("expected fn, got {:?}", other),
    }
}

#[test]
fn fn_destructures_pattern_params() {
    let node = analyze("(fn [[a b]] a)");
    match &node.kind {
        NodeKind::Fn { params, body, .. } => {
            assert_eq!(params.len(), 1);
            assert!(params[0].name().starts_with("__phel_"));
            assert_eq!(body.kind_name(), "Let");
        }
        other => panic!("expected fn, got {:?}", other),
    }
}

//===----------------------------------------------------------------------===//
// let / loop / recur
//===----------------------------------------------------------------------===//

#[test]
fn let_bindings_get_shadow_names() {
    let node = analyze("(let [x 1 y x] y)");
    let NodeKind::Let { bindings, body, is_loop } = &node.kind else { panic!("expected let") };
    assert!(!is_loop);
    assert_eq!(bindings[0].symbol, Symbol::new("x"));
    assert_eq!(bindings[0].shadow, Symbol::new("x_1"));
    assert_eq!(bindings[1].init.kind, NodeKind::LocalVar { name: Symbol::new("x_1") });
    assert_eq!(body_ret(body).kind, NodeKind::LocalVar { name: Symbol::new("y_2") });
}

#[test]
fn let_binding_errors() {
    assert_eq!(analyze_err("(let x 1)"), "Binding parameter of 'let must be a vector");
    assert_eq!(analyze_err("(let [x] x)"), "Bindings of 'let must be an even number of parameters");
}

#[test]
fn let_destructures_vectors() {
    let node = analyze("(let [[a & r] [1 2 3]] r)");
    let NodeKind::Let { bindings, body, .. } = &node.kind else { panic!("expected let") };
    assert_eq!(bindings.len(), 1);
    assert!(bindings[0].symbol.name().starts_with("__phel_"));

    let NodeKind::Let { bindings: inner, .. } = &body.kind else { panic!("expected nested let, got {:?}", body.kind) };
    assert_eq!(inner.len(), 2);
    assert!(matches!(&inner[0].init.kind, NodeKind::MethodCall { method, .. } if &**method == "get"));
    assert!(matches!(&inner[1].init.kind, NodeKind::MethodCall { method, .. } if &**method == "slice"));
}

#[test]
fn loop_frame_rebinds_shadows() {
    let node = analyze("(loop [i 0] (if (php/< i 3) (recur (php/+ i 1)) i))");
    let NodeKind::Let { bindings, body, is_loop: true } = &node.kind else { panic!("expected loop") };

    let NodeKind::If { then, .. } = &body_ret(body).kind else { panic!("expected if") };
    match &then.kind {
        NodeKind::Recur { frame, temps, .. } => {
            assert_eq!(frame.params, vec![bindings[0].shadow.clone()]);
            assert_eq!(temps.len(), 1);
        }
        other => panic!("expected recur, got {:?}", other),
    }
}

#[test]
fn recur_errors() {
    assert_eq!(analyze_err("(recur 1)"), "Can't call 'recur here");
    assert_eq!(
        analyze_err("(fn [x] (recur 1 2))"),
        "Wrong number of arguments for 'recur. Expected: 1 args, got: 2"
    );
    assert_eq!(analyze_err("(fn [x] (php/+ (recur 1) 1))"), "Can't call 'recur here");
    assert_eq!(analyze_err("(loop [x 1] (do (recur 2) x))"), "Can't call 'recur here");
}

//===----------------------------------------------------------------------===//
// if / do / foreach / try
//===----------------------------------------------------------------------===//

#[test]
fn if_without_else_yields_nil() {
    let node = analyze("(if true 1)");
    let NodeKind::If { test, otherwise, .. } = &node.kind else { panic!("expected if") };
    assert_eq!(test.context(), EvalContext::Expression);
    assert_eq!(otherwise.kind, NodeKind::Literal { value: Form::nil() });
    assert_eq!(analyze_err("(if)"), "'if requires two or three arguments");
}

#[test]
fn do_in_expression_context_returns_last() {
    let env = Env::empty().with_context(EvalContext::Expression);
    let node = analyze_in(&mut Analyzer::default(), "(do 1 2)", &env);
    let NodeKind::Do { stmts, ret } = &node.kind else { panic!("expected do") };
    assert_eq!(stmts[0].context(), EvalContext::Statement);
    assert_eq!(ret.context(), EvalContext::Return);
}

#[test]
fn foreach_shapes() {
    let node = analyze("(foreach [v [1 2]] v)");
    match &node.kind {
        NodeKind::Foreach { value_symbol, key_symbol, body, .. } => {
            assert_eq!(value_symbol, &Symbol::new("v"));
            assert_eq!(key_symbol, &None);
            assert_eq!(body.context(), EvalContext::Statement);
            assert_eq!(body.kind, NodeKind::LocalVar { name: Symbol::new("v") });
        }
        other => panic!("expected foreach, got {:?}", other),
    }

    let node = analyze("(foreach [k v {:a 1}] k v)");
    match &node.kind {
        NodeKind::Foreach { key_symbol, body, .. } => {
            assert_eq!(key_symbol, &Some(Symbol::new("k")));
            assert_eq!(body.kind_name(), "Do");
        }
        other => panic!("expected foreach, got {:?}", other),
    }

    let node = analyze("(foreach [[a b] [[1 2]]] a)");
    match &node.kind {
        NodeKind::Foreach { value_symbol, key_symbol, body, .. } => {
            assert!(value_symbol.name().starts_with("__phel_"), "{}", value_symbol);
            assert_eq!(key_symbol, &None);
            assert_eq!(body.kind_name(), "Let");
            assert_eq!(body.context(), EvalContext::Statement);
            let NodeKind::Let { bindings, .. } = &body.kind else { unreachable!() };
            assert_eq!(bindings[0].init.kind, NodeKind::LocalVar { name: value_symbol.clone() });
        }
        other => panic!("expected foreach, got {:?}", other),
    }

    assert_eq!(analyze_err("(foreach [v])"), "At least two arguments are required for 'foreach");
    assert_eq!(
        analyze_err("(foreach [a b c d] 1)"),
        "Vector of 'foreach must have exactly two or three elements"
    );
}

#[test]
fn try_without_handlers_passes_through() {
    let node = analyze("(try 1 2)");
    match &node.kind {
        NodeKind::Try { body, catches, finally } => {
            assert!(catches.is_empty());
            assert!(finally.is_none());
            assert_eq!(body.env, node.env);
        }
        other => panic!("expected try, got {:?}", other),
    }
}

#[test]
fn try_catch_finally() {
    let node = analyze("(try (php/foo) (catch \\Exception e e) (finally (php/bar)))");
    let NodeKind::Try { catches, finally, .. } = &node.kind else { panic!("expected try") };
    match &catches[0].kind {
        NodeKind::Catch { class, symbol, .. } => {
            assert_eq!(class.kind, NodeKind::HostClassName { name: "\\Exception".into() });
            assert_eq!(symbol, &Symbol::new("e"));
        }
        other => panic!("expected catch, got {:?}", other),
    }
    assert!(finally.is_some());

    assert_eq!(analyze_err("(try (finally 1) 2)"), "Invalid 'try form");
    assert_eq!(analyze_err("(try (finally 1) (catch \\Exception e 1))"), "Invalid 'try form");
}

//===----------------------------------------------------------------------===//
// def / quote / method calls
//===----------------------------------------------------------------------===//

#[test]
fn def_registers_before_init() {
    let mut analyzer = Analyzer::default();
    let node = analyze_in(&mut analyzer, "(def f \"Doc.\" (fn [] f))", &Env::empty());

    match &node.kind {
        NodeKind::Def { namespace, name, init, .. } => {
            assert_eq!(&**namespace, "user");
            assert_eq!(name, &Symbol::new("f"));
            assert_eq!(init.env.bound_to(), "user\\f");
        }
        other => panic!("expected def, got {:?}", other),
    }
    let meta = analyzer.globals().get_definition("user", "f").expect("defined");
    assert_eq!(meta.doc(), Some("Doc."));
}

#[test]
fn def_errors() {
    assert_eq!(analyze_err("(def x)"), "Two or three arguments are required for 'def. Got 1");
    assert_eq!(analyze_err("(def \"x\" 1)"), "First argument of 'def must be a Symbol.");
    assert_eq!(analyze_err("(def x 1 2)"), "Meta must be a String or Map");
    assert_eq!(analyze_err("(def x (def y 1))"), "'def inside of a 'def is forbidden");
    assert_eq!(analyze_err("(fn [] (def y 1))"), "'def inside of a 'def is forbidden");
}

#[test]
fn quote_keeps_the_form() {
    let node = analyze("'(a b)");
    match &node.kind {
        NodeKind::Quote { value } => assert_eq!(value.to_string(), "(a b)"),
        other => panic!("expected quote, got {:?}", other),
    }
}

#[test]
fn method_calls() {
    let node = analyze("(.format \\DateTime \"Y\")");
    match &node.kind {
        NodeKind::MethodCall { target, method, args } => {
            assert_eq!(target.kind_name(), "HostClassName");
            assert_eq!(&**method, "format");
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected method call, got {:?}", other),
    }
    assert_eq!(analyze_err("(.format)"), "Method call .format requires a target");
}

#[test]
fn array_push() {
    let node = analyze("(let [a @[]] (php/apush a 1))");
    let NodeKind::Let { body, .. } = &node.kind else { panic!("expected let") };
    assert_eq!(body_ret(body).kind_name(), "CollectionPush");
}
