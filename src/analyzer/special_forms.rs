use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::destructure::destructure;
use super::symbol::check_identifier;
use super::{do_form, invalid_form, nil_node, wrong_args, Analyzer};
use crate::ast::{Binding, Node, NodeKind};
use crate::core::{Meta, RecurFrame, SpecialForm, CORE_NAMESPACE};
use crate::env::{Env, EvalContext};
use crate::error::{error_at, AnalyzerError, SpannedResult};
use crate::form::{Form, Location, Symbol};

static NS_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z\x{7f}-\x{10FFFF}][a-zA-Z0-9\-\x{7f}-\x{10FFFF}]*$")
        .expect("namespace pattern is valid")
});

impl Analyzer {
    pub(super) fn analyze_special_form(
        &mut self,
        special: SpecialForm,
        form: &Form,
        args: &[Form],
        env: &Env,
    ) -> SpannedResult<Node> {
        let loc = form.loc();
        match special {
            SpecialForm::Def => self.analyze_def(args, loc, env),
            SpecialForm::Do => self.analyze_do(args, loc, env),
            SpecialForm::Fn => self.analyze_fn(args, loc, env),
            SpecialForm::Foreach => self.analyze_foreach(args, loc, env),
            SpecialForm::If => self.analyze_if(args, loc, env),
            SpecialForm::Let => self.analyze_let(args, loc, env, false),
            SpecialForm::Loop => self.analyze_let(args, loc, env, true),
            SpecialForm::Ns => self.analyze_ns(args, loc, env),
            SpecialForm::Quote => self.analyze_quote(args, loc, env),
            SpecialForm::Recur => self.analyze_recur(args, loc, env),
            SpecialForm::Throw => self.analyze_throw(args, loc, env),
            SpecialForm::Try => self.analyze_try(args, loc, env),
            SpecialForm::ArrayPush => self.analyze_array_push(args, loc, env),
        }
    }

    //===------------------------------------------------------------------===//
    // fn
    //===------------------------------------------------------------------===//

    /// Analyze (fn [params...] body...)
    fn analyze_fn(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let Some(params_form) = args.first() else {
            return Err(wrong_args(loc, "fn requires at least one argument"));
        };
        let Form::Vector { items: raw_params, .. } = params_form else {
            return Err(invalid_form(params_form.loc().or(loc), "Second argument of 'fn must be a vector"));
        };

        let mut params = Vec::with_capacity(raw_params.len());
        let mut variadic = false;
        // Patterns in parameter position, as `pattern gensym` pairs.
        let mut lets = Vec::new();

        let mut index = 0;
        while index < raw_params.len() {
            let param = &raw_params[index];
            if param.is_symbol_named("&") {
                let rest = &raw_params[index + 1..];
                if rest.len() != 1 {
                    return Err(invalid_form(
                        param.loc().or(loc),
                        "Unsupported parameter form, only one symbol can follow the & parameter",
                    ));
                }
                variadic = true;
                params.push(self.fn_param(&rest[0], &mut lets, loc)?);
                break;
            }
            params.push(self.fn_param(param, &mut lets, loc)?);
            index += 1;
        }

        let frame = RecurFrame::new(self.gensym.next_id(), params.clone());
        let body_env = env
            .with_merged_locals(&params)
            .with_context(EvalContext::Return)
            .with_recur_frame(frame.clone())
            .with_bound_to("")
            .with_def_allowed(false);

        let body_forms = &args[1..];
        let body_form = if lets.is_empty() {
            do_form(body_forms, loc)
        } else {
            let_form(lets, body_forms, loc)
        };
        let body = self.analyze(&body_form, &body_env)?;

        let uses = env.locals().filter(|local| !params.contains(local)).cloned().collect();

        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::Fn { params, variadic, body: Box::new(body), uses, frame },
        ))
    }

    fn fn_param(&mut self, param: &Form, lets: &mut Vec<Form>, loc: Option<&Location>) -> SpannedResult<Symbol> {
        match param {
            Form::Symbol { value, loc: param_loc } => {
                check_identifier(value, param_loc.as_ref().or(loc))?;
                Ok(value.clone())
            }
            pattern => {
                let tmp = self.gensym.gen();
                lets.push(pattern.clone());
                lets.push(Form::from_symbol(tmp.clone()));
                Ok(tmp)
            }
        }
    }

    //===------------------------------------------------------------------===//
    // do / if
    //===------------------------------------------------------------------===//

    fn analyze_do(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let Some((last, leading)) = args.split_last() else {
            return Ok(Node::new(env, loc.cloned(), NodeKind::Do { stmts: vec![], ret: Box::new(nil_node(env)) }));
        };

        let stmt_env = env.with_context(EvalContext::Statement).with_disallowed_recur_frame();
        let stmts = leading
            .iter()
            .map(|form| self.analyze(form, &stmt_env))
            .collect::<SpannedResult<Vec<_>>>()?;

        // A value-position `do` with statements is emitted as a closure, so
        // its last form returns.
        let ret_env = if !stmts.is_empty() && env.context() == EvalContext::Expression {
            env.with_context(EvalContext::Return)
        } else {
            env.clone()
        };
        let ret = self.analyze(last, &ret_env)?;

        Ok(Node::new(env, loc.cloned(), NodeKind::Do { stmts, ret: Box::new(ret) }))
    }

    fn analyze_if(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        if !(2..=3).contains(&args.len()) {
            return Err(wrong_args(loc, "'if requires two or three arguments"));
        }

        let test = self.analyze(&args[0], &env.as_operand())?;
        let then = self.analyze(&args[1], env)?;
        let otherwise = match args.get(2) {
            Some(form) => self.analyze(form, env)?,
            None => nil_node(env),
        };

        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::If { test: Box::new(test), then: Box::new(then), otherwise: Box::new(otherwise) },
        ))
    }

    //===------------------------------------------------------------------===//
    // let / loop / recur
    //===------------------------------------------------------------------===//

    fn analyze_let(
        &mut self,
        args: &[Form],
        loc: Option<&Location>,
        env: &Env,
        is_loop: bool,
    ) -> SpannedResult<Node> {
        let name = if is_loop { "loop" } else { "let" };
        let Some(Form::Vector { items: pairs, loc: pairs_loc }) = args.first() else {
            return Err(invalid_form(loc, format!("Binding parameter of '{} must be a vector", name)));
        };
        if pairs.len() % 2 != 0 {
            return Err(wrong_args(
                pairs_loc.as_ref().or(loc),
                format!("Bindings of '{} must be an even number of parameters", name),
            ));
        }

        let body = &args[1..];
        if is_loop {
            self.analyze_loop_bindings(pairs, body, loc, env)
        } else {
            self.analyze_let_bindings(pairs, body, loc, env)
        }
    }

    /// Binds `pairs` one after another. The first pattern target splits
    /// the let: its value is bound to a fresh symbol here and the rest of
    /// the bindings move into a nested let that destructures that symbol.
    fn analyze_let_bindings(
        &mut self,
        pairs: &[Form],
        body: &[Form],
        loc: Option<&Location>,
        env: &Env,
    ) -> SpannedResult<Node> {
        let wraps = env.context() == EvalContext::Expression && !pairs.is_empty();
        let body_context = if wraps { EvalContext::Return } else { env.context() };

        let mut bindings = Vec::with_capacity(pairs.len() / 2);
        let mut scope = env.clone();

        for (index, pair) in pairs.chunks(2).enumerate() {
            let (target, init) = (&pair[0], &pair[1]);
            match target {
                Form::Symbol { value, loc: target_loc } => {
                    check_identifier(value, target_loc.as_ref().or(loc))?;
                    let binding = self.analyze_binding(value, init, target_loc.as_ref(), &scope)?;
                    scope = scope
                        .with_merged_locals([value])
                        .with_shadowed_local(value, binding.shadow.clone());
                    bindings.push(binding);
                }
                pattern => {
                    let tmp = self.gensym.gen();
                    let binding = self.analyze_binding(&tmp, init, pattern.loc(), &scope)?;
                    scope = scope
                        .with_merged_locals([&tmp])
                        .with_shadowed_local(&tmp, binding.shadow.clone());
                    bindings.push(binding);

                    let mut rest = destructure(pattern, &tmp)?;
                    rest.extend_from_slice(&pairs[(index + 1) * 2..]);
                    let nested = let_form(rest, body, loc);
                    let body = self.analyze(&nested, &scope.with_context(body_context))?;

                    return Ok(Node::new(
                        env,
                        loc.cloned(),
                        NodeKind::Let { bindings, body: Box::new(body), is_loop: false },
                    ));
                }
            }
        }

        let body = self.analyze_body(body, loc, &scope.with_context(body_context))?;
        Ok(Node::new(env, loc.cloned(), NodeKind::Let { bindings, body: Box::new(body), is_loop: false }))
    }

    /// Loop targets must be plain names since `recur` reassigns them; a
    /// pattern target binds a fresh symbol and is destructured inside the
    /// loop body on every iteration.
    fn analyze_loop_bindings(
        &mut self,
        pairs: &[Form],
        body: &[Form],
        loc: Option<&Location>,
        env: &Env,
    ) -> SpannedResult<Node> {
        let body_context = match env.context() {
            EvalContext::Expression => EvalContext::Return,
            other => other,
        };

        let mut bindings = Vec::with_capacity(pairs.len() / 2);
        let mut lets = Vec::new();
        let mut scope = env.clone();

        for pair in pairs.chunks(2) {
            let (target, init) = (&pair[0], &pair[1]);
            let (sym, target_loc) = match target {
                Form::Symbol { value, loc: target_loc } => {
                    check_identifier(value, target_loc.as_ref().or(loc))?;
                    (value.clone(), target_loc.as_ref())
                }
                pattern => {
                    let tmp = self.gensym.gen();
                    lets.push(pattern.clone());
                    lets.push(Form::from_symbol(tmp.clone()));
                    (tmp, pattern.loc())
                }
            };
            let binding = self.analyze_binding(&sym, init, target_loc, &scope)?;
            scope = scope.with_merged_locals([&sym]).with_shadowed_local(&sym, binding.shadow.clone());
            bindings.push(binding);
        }

        let frame = RecurFrame::new(
            self.gensym.next_id(),
            bindings.iter().map(|b| b.shadow.clone()).collect(),
        );
        let body_env = scope.with_context(body_context).with_recur_frame(frame);
        let body_form = if lets.is_empty() { do_form(body, loc) } else { let_form(lets, body, loc) };
        let body = self.analyze(&body_form, &body_env)?;

        Ok(Node::new(env, loc.cloned(), NodeKind::Let { bindings, body: Box::new(body), is_loop: true }))
    }

    fn analyze_binding(
        &mut self,
        sym: &Symbol,
        init: &Form,
        loc: Option<&Location>,
        scope: &Env,
    ) -> SpannedResult<Binding> {
        let shadow = self.gensym.gen_with_prefix(&format!("{}_", sym.name()));
        let init_env = scope.as_operand().with_bound_to(sym.name());
        let init = self.analyze(init, &init_env)?;
        Ok(Binding { symbol: sym.clone(), shadow, init, loc: loc.cloned() })
    }

    fn analyze_recur(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let Some(frame) = env.current_recur_frame().cloned() else {
            return Err(error_at(loc, AnalyzerError::InvalidRecur { reason: "Can't call 'recur here".to_string() }));
        };
        if args.len() != frame.arity() {
            return Err(error_at(
                loc,
                AnalyzerError::InvalidRecur {
                    reason: format!(
                        "Wrong number of arguments for 'recur. Expected: {} args, got: {}",
                        frame.arity(),
                        args.len()
                    ),
                },
            ));
        }

        let args = self.analyze_operands(args, env)?;
        let temps = args.iter().map(|_| self.gensym.gen()).collect();
        Ok(Node::new(env, loc.cloned(), NodeKind::Recur { frame, args, temps }))
    }

    //===------------------------------------------------------------------===//
    // foreach
    //===------------------------------------------------------------------===//

    /// Analyze (foreach [value coll] body...) or (foreach [key value coll] body...)
    fn analyze_foreach(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        if args.len() < 2 {
            return Err(wrong_args(loc, "At least two arguments are required for 'foreach"));
        }
        let Form::Vector { items: binding, loc: binding_loc } = &args[0] else {
            return Err(invalid_form(args[0].loc().or(loc), "First argument of 'foreach must be a vector"));
        };

        let (key_form, value_form, coll_form) = match binding.as_slice() {
            [value, coll] => (None, value, coll),
            [key, value, coll] => (Some(key), value, coll),
            _ => {
                return Err(wrong_args(
                    binding_loc.as_ref().or(loc),
                    "Vector of 'foreach must have exactly two or three elements",
                ))
            }
        };

        let mut lets = Vec::new();
        let value_symbol = self.foreach_binding(value_form, &mut lets, loc)?;
        let key_symbol = key_form.map(|k| self.foreach_binding(k, &mut lets, loc)).transpose()?;

        let body_forms = &args[1..];
        let body_form = if !lets.is_empty() {
            let_form(lets, body_forms, loc)
        } else if let [single] = body_forms {
            single.clone()
        } else {
            do_form(body_forms, loc)
        };

        let mut locals = vec![value_symbol.clone()];
        locals.extend(key_symbol.iter().cloned());
        let body_env = env
            .with_merged_locals(&locals)
            .with_context(EvalContext::Statement)
            .with_disallowed_recur_frame();

        let coll = self.analyze(coll_form, &env.as_operand())?;
        let body = self.analyze(&body_form, &body_env)?;

        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::Foreach { value_symbol, key_symbol, coll: Box::new(coll), body: Box::new(body) },
        ))
    }

    fn foreach_binding(&mut self, form: &Form, lets: &mut Vec<Form>, loc: Option<&Location>) -> SpannedResult<Symbol> {
        match form {
            Form::Symbol { value, loc: sym_loc } => {
                check_identifier(value, sym_loc.as_ref().or(loc))?;
                Ok(value.clone())
            }
            pattern => {
                let tmp = self.gensym.gen();
                lets.push(pattern.clone());
                lets.push(Form::from_symbol(tmp.clone()));
                Ok(tmp)
            }
        }
    }

    //===------------------------------------------------------------------===//
    // try / throw
    //===------------------------------------------------------------------===//

    /// Analyze (try body... (catch Class e body...)* (finally body...)?)
    fn analyze_try(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        #[derive(PartialEq, PartialOrd)]
        enum Section {
            Body,
            Catches,
            Finally,
        }

        let mut section = Section::Body;
        let mut body = Vec::new();
        let mut catch_forms = Vec::new();
        let mut finally_form = None;

        for form in args {
            match clause_head(form) {
                Some("catch") if section <= Section::Catches => {
                    section = Section::Catches;
                    catch_forms.push(form);
                }
                Some("finally") if section < Section::Finally => {
                    section = Section::Finally;
                    finally_form = Some(form);
                }
                None if section == Section::Body => body.push(form.clone()),
                _ => return Err(invalid_form(form.loc().or(loc), "Invalid 'try form")),
            }
        }

        if catch_forms.is_empty() && finally_form.is_none() {
            let body = self.analyze_body(&body, loc, env)?;
            return Ok(Node::new(
                env,
                loc.cloned(),
                NodeKind::Try { body: Box::new(body), catches: vec![], finally: None },
            ));
        }

        let exec_context = match env.context() {
            EvalContext::Expression => EvalContext::Return,
            other => other,
        };
        let body_env = env.with_context(exec_context).with_disallowed_recur_frame();
        let body = self.analyze_body(&body, loc, &body_env)?;

        let catches = catch_forms
            .into_iter()
            .map(|form| self.analyze_catch(form, &body_env))
            .collect::<SpannedResult<Vec<_>>>()?;

        let finally = match finally_form {
            Some(form) => {
                let items = list_items(form);
                let finally_env = env.with_context(EvalContext::Statement).with_disallowed_recur_frame();
                Some(Box::new(self.analyze_body(&items[1..], form.loc(), &finally_env)?))
            }
            None => None,
        };

        Ok(Node::new(env, loc.cloned(), NodeKind::Try { body: Box::new(body), catches, finally }))
    }

    fn analyze_catch(&mut self, form: &Form, env: &Env) -> SpannedResult<Node> {
        let loc = form.loc();
        let items = list_items(form);
        let (class_form, symbol) = match items {
            [_, class_form, Form::Symbol { value, .. }, ..] if value.ns.is_none() => (class_form, value),
            _ => return Err(invalid_form(loc, "Invalid 'catch form, expected (catch Class name body...)")),
        };

        let class = self.analyze(class_form, &env.as_operand())?;
        if !matches!(class.kind, NodeKind::HostClassName { .. }) {
            return Err(invalid_form(
                class_form.loc().or(loc),
                format!("First argument of 'catch must be a class name, got {}", class_form),
            ));
        }

        let body_env = env.with_merged_locals([symbol]);
        let body = self.analyze_body(&items[3..], loc, &body_env)?;

        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::Catch { class: Box::new(class), symbol: symbol.clone(), body: Box::new(body) },
        ))
    }

    fn analyze_throw(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let [exception] = args else {
            return Err(wrong_args(loc, "'throw requires exactly one argument"));
        };
        let exception = self.analyze(exception, &env.as_operand())?;
        Ok(Node::new(env, loc.cloned(), NodeKind::Throw { exception: Box::new(exception) }))
    }

    //===------------------------------------------------------------------===//
    // quote / php/apush
    //===------------------------------------------------------------------===//

    fn analyze_quote(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let [value] = args else {
            return Err(wrong_args(loc, "Exactly one argument is required for 'quote"));
        };
        Ok(Node::new(env, loc.cloned(), NodeKind::Quote { value: value.clone() }))
    }

    fn analyze_array_push(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let [target, value] = args else {
            return Err(wrong_args(loc, "'php/apush requires exactly two arguments"));
        };
        let operand = env.as_operand();
        let target = self.analyze(target, &operand)?;
        let value = self.analyze(value, &operand)?;
        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::CollectionPush { target: Box::new(target), value: Box::new(value) },
        ))
    }

    //===------------------------------------------------------------------===//
    // def
    //===------------------------------------------------------------------===//

    /// Analyze (def name value), (def name "doc" value) or (def name {meta} value)
    fn analyze_def(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        if !env.is_def_allowed() {
            return Err(error_at(loc, AnalyzerError::NestedDef));
        }
        if !(2..=3).contains(&args.len()) {
            return Err(wrong_args(
                loc,
                format!("Two or three arguments are required for 'def. Got {}", args.len()),
            ));
        }

        let name = match &args[0] {
            Form::Symbol { value, .. } if value.ns.is_none() => value.clone(),
            other => {
                return Err(error_at(
                    other.loc().or(loc),
                    AnalyzerError::InvalidSymbol { reason: "First argument of 'def must be a Symbol.".to_string() },
                ))
            }
        };

        let (meta_form, init) = if args.len() == 3 {
            let meta_form = match &args[1] {
                Form::Str { loc: doc_loc, value } => {
                    Form::map(vec![(Form::keyword("doc"), Form::string(value.clone()))]).with_loc(doc_loc.clone())
                }
                map @ Form::Map { .. } => map.clone(),
                other => return Err(invalid_form(other.loc().or(loc), "Meta must be a String or Map")),
            };
            (meta_form, &args[2])
        } else {
            (Form::map(vec![]), &args[1])
        };

        let meta = match &meta_form {
            Form::Map { entries, .. } => Meta::from_entries(entries),
            _ => Meta::new(),
        };

        let namespace: Arc<str> = Arc::from(self.globals.namespace());
        // Registered before the value is analyzed so the value can refer
        // to the definition itself.
        self.globals.add_definition(&namespace, name.name(), meta);
        debug!(target: "phelc::analyzer", ns = %namespace, name = %name, "registered definition");

        let meta = self.analyze(&meta_form, &env.as_operand())?;
        let init_env = env
            .as_operand()
            .with_bound_to(format!("{}\\{}", namespace, name))
            .with_def_allowed(false);
        let init = self.analyze(init, &init_env)?;

        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::Def { namespace, name, meta: Box::new(meta), init: Box::new(init) },
        ))
    }

    //===------------------------------------------------------------------===//
    // ns
    //===------------------------------------------------------------------===//

    /// Analyze (ns name (:require a\b :as c :refer [x])* (:use \A\B :as C)*)
    fn analyze_ns(&mut self, args: &[Form], loc: Option<&Location>, env: &Env) -> SpannedResult<Node> {
        let name = match args.first() {
            Some(Form::Symbol { value, .. }) if value.ns.is_none() => value.clone(),
            other => {
                return Err(error_at(
                    other.and_then(Form::loc).or(loc),
                    AnalyzerError::InvalidSymbol { reason: "First argument of 'ns must be a Symbol".to_string() },
                ))
            }
        };
        let namespace = name.name().trim_start_matches('\\');
        if !namespace.split('\\').all(|segment| NS_SEGMENT.is_match(segment)) {
            return Err(error_at(
                args[0].loc().or(loc),
                AnalyzerError::InvalidSymbol {
                    reason: "The namespace is not valid. A valid namespace name starts with a letter, \
                             followed by any number of letters, numbers, or dashes. Elements are split \
                             by a backslash."
                        .to_string(),
                },
            ));
        }

        self.globals.set_namespace(namespace);
        debug!(target: "phelc::analyzer", ns = %namespace, "switched namespace");

        let mut requires = Vec::new();
        if namespace != CORE_NAMESPACE {
            requires.push(Symbol::new(CORE_NAMESPACE));
        }

        for clause in &args[1..] {
            let items = match clause {
                Form::List { items, .. } => items.as_slice(),
                other => return Err(invalid_form(other.loc().or(loc), "Invalid 'ns clause, expected (:require ...) or (:use ...)")),
            };
            match items.first() {
                Some(Form::Keyword { value, .. }) if &*value.name == "require" => {
                    let required = self.ns_require(&items[1..], clause.loc().or(loc))?;
                    if !requires.contains(&required) {
                        requires.push(required);
                    }
                }
                Some(Form::Keyword { value, .. }) if &*value.name == "use" => {
                    self.ns_use(&items[1..], clause.loc().or(loc))?;
                }
                _ => return Err(invalid_form(clause.loc().or(loc), "Invalid 'ns clause, expected (:require ...) or (:use ...)")),
            }
        }

        Ok(Node::new(env, loc.cloned(), NodeKind::Ns { namespace: Arc::from(namespace), requires }))
    }

    fn ns_require(&mut self, items: &[Form], loc: Option<&Location>) -> SpannedResult<Symbol> {
        let Some(Form::Symbol { value: target, .. }) = items.first() else {
            return Err(invalid_form(loc, "First argument in :require must be a symbol"));
        };
        let target_ns = target.name().trim_start_matches('\\');

        let mut alias = last_segment(target_ns).to_string();
        let mut refers = Vec::new();
        for option in items[1..].chunks(2) {
            match option {
                [Form::Keyword { value, .. }, Form::Symbol { value: as_sym, .. }] if &*value.name == "as" => {
                    alias = as_sym.name().to_string();
                }
                [Form::Keyword { value, .. }, Form::Vector { items, .. }] if &*value.name == "refer" => {
                    for item in items {
                        let Some(sym) = item.as_symbol() else {
                            return Err(invalid_form(item.loc().or(loc), ":refer expects a vector of symbols"));
                        };
                        refers.push(sym.name().to_string());
                    }
                }
                _ => return Err(invalid_form(loc, "Invalid :require option, expected :as or :refer")),
            }
        }

        self.globals.add_require_alias(&alias, target_ns);
        for name in &refers {
            self.globals.add_refer(name, target_ns);
        }
        Ok(Symbol::new(target_ns))
    }

    fn ns_use(&mut self, items: &[Form], loc: Option<&Location>) -> SpannedResult<()> {
        let Some(Form::Symbol { value: class, .. }) = items.first() else {
            return Err(invalid_form(loc, "First argument in :use must be a symbol"));
        };
        let class_name = class.name().trim_start_matches('\\');

        let alias = match &items[1..] {
            [] => last_segment(class_name).to_string(),
            [Form::Keyword { value, .. }, Form::Symbol { value: as_sym, .. }] if &*value.name == "as" => {
                as_sym.name().to_string()
            }
            _ => return Err(invalid_form(loc, "Invalid :use option, expected :as")),
        };

        self.globals.add_use_alias(&alias, &format!("\\{}", class_name));
        Ok(())
    }
}

//===----------------------------------------------------------------------===//
// Helpers
//===----------------------------------------------------------------------===//

/// `(let [pairs...] body...)`
fn let_form(pairs: Vec<Form>, body: &[Form], loc: Option<&Location>) -> Form {
    let mut items = Vec::with_capacity(body.len() + 2);
    items.push(Form::symbol("let"));
    items.push(Form::vector(pairs).with_loc(loc.cloned()));
    items.extend_from_slice(body);
    Form::list(items).with_loc(loc.cloned())
}

/// `catch`/`finally` for a clause of a `try` form.
fn clause_head(form: &Form) -> Option<&str> {
    match form {
        Form::List { items, .. } => match items.first() {
            Some(head) if head.is_symbol_named("catch") => Some("catch"),
            Some(head) if head.is_symbol_named("finally") => Some("finally"),
            _ => None,
        },
        _ => None,
    }
}

fn list_items(form: &Form) -> &[Form] {
    match form {
        Form::List { items, .. } => items,
        _ => &[],
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}
