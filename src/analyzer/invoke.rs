use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use super::{invalid_form, wrong_args, Analyzer};
use crate::ast::{Node, NodeKind};
use crate::codegen;
use crate::core::ExpandFn;
use crate::env::Env;
use crate::error::{error_at, AnalyzerError, SpannedResult};
use crate::form::{Form, Location, Symbol};

impl Analyzer {
    /// `(head args...)` where `head` is not a special form.
    pub(super) fn analyze_invoke(&mut self, form: &Form, items: &[Form], env: &Env) -> SpannedResult<Node> {
        let loc = form.loc();
        let (head, args) = (&items[0], &items[1..]);

        if let Some(method) = method_name(head) {
            return self.analyze_method_call(method, args, loc, env);
        }

        let callee = self.analyze(head, &env.as_operand())?;

        if let NodeKind::GlobalVar { namespace, name, meta } = &callee.kind {
            let qualified = format!("{}/{}", namespace, name);
            if meta.is_macro() {
                let expander = self
                    .globals
                    .compile_time_fns(namespace, name.name())
                    .and_then(|fns| fns.macro_fn.clone());
                return self.expand_macro(&qualified, expander, args, loc, env);
            }

            let inline = self
                .globals
                .compile_time_fns(namespace, name.name())
                .filter(|fns| fns.inlines(args.len()))
                .and_then(|fns| fns.inline_fn.clone());
            if let Some(inline) = inline {
                debug!(target: "phelc::analyzer", name = %qualified, argc = args.len(), "inlining call");
                let replacement = call_expander(&inline, args).map_err(|message| {
                    error_at(loc, AnalyzerError::MacroExpansion { name: qualified.clone(), message })
                })?;
                return self.analyze(&with_call_location(replacement, loc), env);
            }
        }

        if let NodeKind::HostVar { name } = &callee.kind {
            let prefix_call = args.len() == 1 && codegen::is_prefix(name);
            if codegen::is_infix(name) && args.len() < 2 && !prefix_call {
                return Err(wrong_args(
                    loc,
                    format!("Host operator '{}' requires at least two arguments", name),
                ));
            }
        }

        let args = self.analyze_operands(args, env)?;
        Ok(Node::new(env, loc.cloned(), NodeKind::Call { callee: Box::new(callee), args }))
    }

    /// Runs a macro on the unanalyzed arguments and analyzes what it
    /// returns under the caller's env. Errors raised while analyzing the
    /// expansion are passed through as they are.
    fn expand_macro(
        &mut self,
        qualified: &str,
        expander: Option<ExpandFn>,
        args: &[Form],
        loc: Option<&Location>,
        env: &Env,
    ) -> SpannedResult<Node> {
        let expansion_error = |message: String| {
            error_at(loc, AnalyzerError::MacroExpansion { name: qualified.to_string(), message })
        };

        let expander = expander
            .ok_or_else(|| expansion_error("no compile-time expander is registered".to_string()))?;

        debug!(target: "phelc::analyzer", name = %qualified, "expanding macro");
        let expanded = call_expander(&expander, args).map_err(expansion_error)?;

        self.analyze(&with_call_location(expanded, loc), env)
    }

    /// `(.method target args...)`
    fn analyze_method_call(
        &mut self,
        method: Arc<str>,
        args: &[Form],
        loc: Option<&Location>,
        env: &Env,
    ) -> SpannedResult<Node> {
        let Some((target, rest)) = args.split_first() else {
            return Err(invalid_form(loc, format!("Method call .{} requires a target", method)));
        };

        let target = self.analyze(target, &env.as_operand())?;
        let args = self.analyze_operands(rest, env)?;
        Ok(Node::new(
            env,
            loc.cloned(),
            NodeKind::MethodCall { target: Box::new(target), method, args },
        ))
    }
}

/// `.foo` heads name a host method `foo`.
fn method_name(head: &Form) -> Option<Arc<str>> {
    match head {
        Form::Symbol { value: Symbol { ns: None, name }, .. }
            if name.len() > 1 && name.starts_with('.') && !name.starts_with("..") =>
        {
            Some(Arc::from(&name[1..]))
        }
        _ => None,
    }
}

fn with_call_location(form: Form, loc: Option<&Location>) -> Form {
    match loc {
        Some(loc) => form.with_default_location(loc),
        None => form,
    }
}

/// The one place compile-time code runs. A panic inside the expander is
/// reported like an error it returned.
fn call_expander(expander: &ExpandFn, args: &[Form]) -> Result<Form, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| expander(args))) {
        Ok(result) => result,
        Err(payload) => Err(payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "expander panicked".to_string())),
    }
}
