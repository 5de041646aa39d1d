//! Tests for the PHP emitted for analyzed forms.

use phelc::analyzer::Analyzer;
use phelc::codegen::Emitter;
use phelc::compiler::Compiler;
use phelc::config::CompileOptions;
use phelc::env::{Env, EvalContext};
use phelc::reader;

fn compile(src: &str) -> String {
    Compiler::default()
        .compile(src, "t.phel")
        .unwrap_or_else(|err| panic!("failed to compile `{}`: {}", src, err))
        .code
}

/// Emits `src` as a value, the way it would appear inside a call argument.
fn emit_expr(src: &str) -> String {
    let form = reader::read(src).unwrap_or_else(|err| panic!("failed to read `{}`: {}", src, err));
    let env = Env::empty().with_context(EvalContext::Expression);
    let node = Analyzer::with_prelude()
        .analyze(&form, &env)
        .unwrap_or_else(|err| panic!("failed to analyze `{}`: {}", src, err));
    Emitter::new(false).emit(&node).code
}

//===----------------------------------------------------------------------===//
// Literals
//===----------------------------------------------------------------------===//

#[test]
fn literal_values() {
    assert_eq!(emit_expr("42"), "42");
    assert_eq!(emit_expr("1.0"), "1.0");
    assert_eq!(emit_expr("nil"), "null");
    assert_eq!(emit_expr("true"), "true");
    assert_eq!(emit_expr(r#""a$b""#), r#""a\$b""#);
    assert_eq!(emit_expr(":k"), r#"\Phel\Lang\Keyword::create("k")"#);
}

#[test]
fn collections() {
    assert_eq!(
        emit_expr("[1 2]"),
        r#"\Phel\Lang\TypeFactory::getInstance()->persistentVectorFromArray([1, 2])"#
    );
    assert_eq!(
        emit_expr("{:a 1}"),
        r#"\Phel\Lang\TypeFactory::getInstance()->persistentMapFromKVs(\Phel\Lang\Keyword::create("a"), 1)"#
    );
    assert_eq!(
        emit_expr("#{1}"),
        r#"\Phel\Lang\TypeFactory::getInstance()->persistentHashSetFromArray([1])"#
    );
    assert_eq!(emit_expr("@[1 2]"), "[1, 2]");
}

#[test]
fn quoted_forms_are_data() {
    assert_eq!(
        emit_expr("'(a 1)"),
        r#"\Phel\Lang\TypeFactory::getInstance()->persistentListFromArray([\Phel\Lang\Symbol::create("a"), 1])"#
    );
}

//===----------------------------------------------------------------------===//
// Control flow
//===----------------------------------------------------------------------===//

#[test]
fn if_is_a_ternary_in_expression_context() {
    assert_eq!(emit_expr("(if true 1 2)"), r#"((\Phel\Lang\Truthy::isTruthy(true)) ? 1 : 2)"#);
}

#[test]
fn if_is_a_block_in_statement_context() {
    assert_eq!(
        compile("(if true 1 2)"),
        "if (\\Phel\\Lang\\Truthy::isTruthy(true)) {\n  1;\n} else {\n  2;\n}\n"
    );
}

#[test]
fn retargeted_if_switches_shape() {
    let form = reader::read("(if true 1 2)").expect("reads");
    let env = Env::empty().with_context(EvalContext::Expression);
    let node = Analyzer::default().analyze(&form, &env).expect("analyzes");
    let mut emitter = Emitter::new(false);

    assert_eq!(emitter.emit(&node).code, r#"((\Phel\Lang\Truthy::isTruthy(true)) ? 1 : 2)"#);
    assert_eq!(
        emitter.emit(&node.with_context(EvalContext::Statement)).code,
        "if (\\Phel\\Lang\\Truthy::isTruthy(true)) {\n  1;\n} else {\n  2;\n}"
    );
}

#[test]
fn try_without_handlers_emits_like_do() {
    assert_eq!(compile("(try 1 2)"), compile("(do 1 2)"));
    assert_eq!(emit_expr("(try 1 2)"), emit_expr("(do 1 2)"));
}

#[test]
fn try_catch() {
    assert_eq!(
        compile("(try (php/foo) (catch \\Exception e (php/bar e)))"),
        "try {\n  foo();\n} catch (\\Exception $e) {\n  bar($e);\n}\n"
    );
}

#[test]
fn try_in_expression_context_is_wrapped() {
    let code = emit_expr("(try (php/foo) (finally (php/bar)))");
    assert_eq!(code, "(function() {\n  try {\n    return foo();\n  } finally {\n    bar();\n  }\n})()");
}

#[test]
fn do_in_expression_context_captures_locals() {
    assert_eq!(
        compile("(let [a 1] (php/print (do (php/foo) a)))"),
        "$a_1 = 1;\nprint((function() use(&$a_1) {\n  foo();\n  return $a_1;\n})());\n"
    );
}

#[test]
fn let_in_each_context() {
    assert_eq!(compile("(let [x 1] x)"), "$x_1 = 1;\n$x_1;\n");
    assert_eq!(emit_expr("(let [x 1] x)"), "(function() {\n  $x_1 = 1;\n  return $x_1;\n})()");
    assert_eq!(compile("(let [empty? 1] empty?)"), "$empty_QMARK__1 = 1;\n$empty_QMARK__1;\n");
}

#[test]
fn loop_becomes_while() {
    let code = compile("(loop [i 0] (if (php/< i 3) (recur (php/+ i 1)) i))");
    assert!(code.starts_with("$i_1 = 0;\nwhile (true) {\n"), "{}", code);
    assert!(code.contains("  if (\\Phel\\Lang\\Truthy::isTruthy(($i_1 < 3))) {\n"), "{}", code);
    assert!(code.contains("    $__phel_3 = ($i_1 + 1);\n    $i_1 = $__phel_3;\n    continue;\n"), "{}", code);
    assert!(code.ends_with("  break;\n}\n"), "{}", code);
}

#[test]
fn foreach_statement() {
    assert_eq!(
        compile("(foreach [k v [1 2]] (php/print k v))"),
        "foreach ((\\Phel\\Lang\\TypeFactory::getInstance()->persistentVectorFromArray([1, 2]) ?? []) as $k => $v) {\n  print($k, $v);\n}\n"
    );
}

#[test]
fn foreach_in_expression_context_returns_null() {
    let code = emit_expr("(foreach [v [1]] v)");
    assert!(code.starts_with("(function() {\n  foreach (("), "{}", code);
    assert!(code.ends_with("  }\n  return null;\n})()"), "{}", code);
}

//===----------------------------------------------------------------------===//
// Functions & calls
//===----------------------------------------------------------------------===//

#[test]
fn fn_is_an_anonymous_class() {
    assert_eq!(
        compile("(fn [x] x)"),
        "new class() extends \\Phel\\Lang\\AbstractFn {\n  public const BOUND_TO = \"\";\n\n  public function __invoke($x) {\n    return $x;\n  }\n};\n"
    );
}

#[test]
fn fn_captures_through_constructor() {
    let code = compile("(let [a 1] (fn [] a))");
    for fragment in [
        "new class($a_1) extends \\Phel\\Lang\\AbstractFn {",
        "private $a_1;",
        "public function __construct($a_1) {",
        "$this->a_1 = $a_1;",
        "$a_1 = $this->a_1;",
        "return $a_1;",
    ] {
        assert!(code.contains(fragment), "missing `{}` in:\n{}", fragment, code);
    }
}

#[test]
fn variadic_fn_collects_rest_into_vector() {
    let code = compile("(fn [a & xs] xs)");
    assert!(code.contains("public function __invoke($a, ...$xs) {"), "{}", code);
    assert!(
        code.contains("$xs = \\Phel\\Lang\\TypeFactory::getInstance()->persistentVectorFromArray($xs);"),
        "{}",
        code
    );
}

#[test]
fn self_recursive_fn_loops() {
    let code = compile("(fn [n] (if (php/> n 0) (recur (php/- n 1)) n))");
    assert!(code.contains("    while (true) {\n"), "{}", code);
    assert!(code.contains("        $n = $__phel_2;\n        continue;\n"), "{}", code);
    assert!(code.contains("      break;\n    }\n"), "{}", code);
}

#[test]
fn fn_bound_to_its_definition() {
    let code = compile("(def inc (fn [x] (php/+ x 1)))");
    assert!(code.contains("public const BOUND_TO = \"user\\\\inc\";"), "{}", code);
}

#[test]
fn nested_fn_is_not_bound_to_the_outer_definition() {
    let code = compile("(def f (fn [] (fn [] 1)))");
    assert_eq!(code.matches("public const BOUND_TO = \"user\\\\f\";").count(), 1, "{}", code);
    assert_eq!(code.matches("public const BOUND_TO = \"\";").count(), 1, "{}", code);
}

#[test]
fn def_registers_in_registry() {
    assert_eq!(
        compile("(def x 1)"),
        "\\Phel\\Lang\\Registry::getInstance()->addDefinition(\n  \"user\",\n  \"x\",\n  1,\n  null\n);\n"
    );
    let with_doc = compile("(def x \"Doc.\" 1)");
    assert!(
        with_doc.contains("persistentMapFromKVs(\\Phel\\Lang\\Keyword::create(\"doc\"), \"Doc.\")"),
        "{}",
        with_doc
    );
}

#[test]
fn calls() {
    assert_eq!(
        compile("(def f 1) (f 2)").lines().last(),
        Some("(\\Phel\\Lang\\Registry::getInstance()->getDefinition(\"user\", \"f\"))(2);")
    );
    assert_eq!(compile("(php/strlen \"ab\")"), "strlen(\"ab\");\n");
    assert_eq!(emit_expr("(php/! true)"), "(!true)");
    assert_eq!(emit_expr("(php/- 1)"), "(-1)");
    assert_eq!(emit_expr("(php/+ 1)"), "(+1)");
    assert_eq!(emit_expr("(php/. \"a\" \"b\" \"c\")"), "(\"a\" . \"b\" . \"c\")");
}

#[test]
fn inline_functions_expand_at_matching_arity() {
    assert_eq!(compile("(+ 1 2)"), "(1 + 2);\n");
    assert_eq!(
        compile("(+ 1 2 3)"),
        "(\\Phel\\Lang\\Registry::getInstance()->getDefinition(\"phel\\\\core\", \"+\"))(1, 2, 3);\n"
    );
}

#[test]
fn method_calls() {
    assert_eq!(emit_expr("(.format \\DateTime \"Y\")"), "\\DateTime::format(\"Y\")");
    assert_eq!(compile("(let [d 1] (.format d \"Y\"))"), "$d_1 = 1;\n($d_1)->format(\"Y\");\n");
}

#[test]
fn throw_and_array_push() {
    assert!(compile("(fn [e] (throw e))").contains("    throw $e;\n"));
    assert_eq!(compile("(let [a @[]] (php/apush a 1))"), "$a_1 = [];\n$a_1[] = 1;\n");
}

#[test]
fn ns_loads_requires() {
    assert_eq!(
        compile("(ns app\\main (:require app\\util))"),
        concat!(
            r#"\Phel\Runtime\RuntimeSingleton::getInstance()->loadNs("phel\\core");"#,
            "\n",
            r#"\Phel\Runtime\RuntimeSingleton::getInstance()->loadNs("app\\util");"#,
            "\n",
            r#"\Phel\Lang\Registry::getInstance()->addDefinition("phel\\core", "*ns*", "app\\main");"#,
            "\n"
        )
    );
}

//===----------------------------------------------------------------------===//
// Formatting options
//===----------------------------------------------------------------------===//

#[test]
fn indent_width_is_configurable() {
    let mut compiler = Compiler::new(CompileOptions::default().with_indent_width(4));
    let code = compiler.compile("(if true 1 2)", "t.phel").expect("compiles").code;
    assert!(code.contains("\n    1;\n"), "{}", code);
}

#[test]
fn source_maps_point_at_forms() {
    let mut compiler = Compiler::new(CompileOptions::default().with_source_maps());
    let unit = compiler.compile("1\n(php/foo 2)", "t.phel").expect("compiles");

    let second = &unit.forms[1];
    assert_eq!(&*second.source_name, "t.phel");
    let mappings = second.source_map.as_deref().expect("source map enabled");
    assert!(mappings.starts_with("AACA"), "{}", mappings);
    assert!(!mappings.contains(';'), "{}", mappings);
}
