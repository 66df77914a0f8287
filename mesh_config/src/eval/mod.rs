//! The expression evaluator. `eval(expr, ctx)` is recursive and
//! left-to-right; argument evaluation order is fixed.
mod builtins;

use std::collections::HashMap;
use std::path::PathBuf;

use mesh_definitions::{Error, ErrorKind, Result};

use crate::expr::Expr;

/// Threaded through every call to `eval`: variable bindings, the
/// evaluator's working directory (paths in `read-file`/`expand-path`
/// resolve against this, not `process::current_dir()`, so evaluation
/// stays reproducible under test), a non-fatal error accumulator, and
/// the strict-mode flag that gates the `shell` built-in.
#[derive(Clone, Debug)]
pub struct EvalContext {
    pub vars: HashMap<String, Expr>,
    pub cwd: PathBuf,
    pub errors: Vec<String>,
    pub strict: bool,
}

impl EvalContext {
    pub fn new(cwd: PathBuf) -> Self {
        EvalContext {
            vars: HashMap::new(),
            cwd,
            errors: Vec::new(),
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn record_issue(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

fn eval_err(form: &str, msg: impl Into<String>) -> Error {
    ErrorKind::ConfigEvalError(form.to_string(), msg.into()).into()
}

/// Evaluates `expr` against `ctx`. Lists dispatch on their head symbol:
/// special forms receive their arguments unevaluated, everything else is
/// a regular function call (arguments evaluated first, left to right).
pub fn eval(expr: &Expr, ctx: &mut EvalContext) -> Result<Expr> {
    match expr {
        Expr::Nil | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) => Ok(expr.clone()),
        Expr::Symbol(name) => eval_symbol(name, ctx),
        Expr::List(items) => {
            if items.is_empty() {
                return Ok(Expr::Nil);
            }
            let head = items[0].as_str().ok_or_else(|| {
                eval_err("<list>", "list head must be a symbol naming a special form or function")
            })?;
            let args = &items[1..];
            match head {
                "if" => eval_if(args, ctx),
                "when" => eval_when(args, ctx, true),
                "unless" => eval_when(args, ctx, false),
                "cond" => eval_cond(args, ctx),
                "and" => eval_and(args, ctx),
                "or" => eval_or(args, ctx),
                "let" => eval_let(args, ctx),
                _ => {
                    let mut evaluated = Vec::with_capacity(args.len());
                    for a in args {
                        evaluated.push(eval(a, ctx)?);
                    }
                    builtins::call(head, evaluated, ctx)
                }
            }
        }
    }
}

const SPECIAL_FORMS: &[&str] = &["if", "when", "unless", "cond", "and", "or", "let"];

/// Whether `name` names something `eval` would actually execute, as
/// opposed to a structural list head (a config section or field name).
pub fn is_dynamic_head(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name) || builtins::is_known(name)
}

/// Evaluates only the sub-forms of a config tree whose head names a
/// special form or builtin (`(env ...)`, `(concat ...)`, `(if ...)`, ...).
/// Everything else — section/field heads, bare role/distribution tags —
/// is structural data and passes through unresolved, so a config tree can
/// mix declarative shape with embedded expressions without every bare
/// symbol needing a binding.
pub fn resolve_config(expr: &Expr, ctx: &mut EvalContext) -> Result<Expr> {
    match expr {
        Expr::List(items) => {
            if items.is_empty() {
                return Ok(Expr::Nil);
            }
            if let Some(head) = items[0].as_str() {
                if is_dynamic_head(head) {
                    return eval(expr, ctx);
                }
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(resolve_config(item, ctx)?);
            }
            Ok(Expr::list(out))
        }
        other => Ok(other.clone()),
    }
}

fn eval_symbol(name: &str, ctx: &mut EvalContext) -> Result<Expr> {
    ctx.vars
        .get(name)
        .cloned()
        .ok_or_else(|| ErrorKind::ConfigEvalError(name.to_string(), "unknown symbol".into()).into())
}

fn eval_if(args: &[Expr], ctx: &mut EvalContext) -> Result<Expr> {
    if args.len() < 2 || args.len() > 3 {
        return Err(eval_err("if", "expects (if cond then [else])"));
    }
    let cond = eval(&args[0], ctx)?;
    if cond.is_truthy() {
        eval(&args[1], ctx)
    } else if let Some(else_branch) = args.get(2) {
        eval(else_branch, ctx)
    } else {
        Ok(Expr::Nil)
    }
}

fn eval_when(args: &[Expr], ctx: &mut EvalContext, polarity: bool) -> Result<Expr> {
    if args.is_empty() {
        return Err(eval_err("when/unless", "expects (when cond body...)"));
    }
    let cond = eval(&args[0], ctx)?;
    if cond.is_truthy() == polarity {
        let mut result = Expr::Nil;
        for body in &args[1..] {
            result = eval(body, ctx)?;
        }
        Ok(result)
    } else {
        Ok(Expr::Nil)
    }
}

fn eval_cond(args: &[Expr], ctx: &mut EvalContext) -> Result<Expr> {
    for clause in args {
        let pair = clause
            .as_list()
            .ok_or_else(|| eval_err("cond", "each clause must be a (predicate body) list"))?;
        if pair.len() != 2 {
            return Err(eval_err("cond", "each clause must have exactly a predicate and a body"));
        }
        let predicate = eval(&pair[0], ctx)?;
        if predicate.is_truthy() {
            return eval(&pair[1], ctx);
        }
    }
    Ok(Expr::Nil)
}

fn eval_and(args: &[Expr], ctx: &mut EvalContext) -> Result<Expr> {
    let mut last = Expr::Bool(true);
    for a in args {
        last = eval(a, ctx)?;
        if !last.is_truthy() {
            return Ok(last);
        }
    }
    Ok(last)
}

fn eval_or(args: &[Expr], ctx: &mut EvalContext) -> Result<Expr> {
    for a in args {
        let v = eval(a, ctx)?;
        if v.is_truthy() {
            return Ok(v);
        }
    }
    Ok(Expr::Bool(false))
}

/// `(let ((name value) ...) body...)`. Shadows bindings for the body
/// scope and restores the previous bindings on every exit path,
/// including early returns from evaluation errors inside the body.
fn eval_let(args: &[Expr], ctx: &mut EvalContext) -> Result<Expr> {
    if args.is_empty() {
        return Err(eval_err("let", "expects (let (bindings...) body...)"));
    }
    let bindings = args[0]
        .as_list()
        .ok_or_else(|| eval_err("let", "first argument must be a list of bindings"))?;

    let mut saved: Vec<(String, Option<Expr>)> = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let pair = binding
            .as_list()
            .ok_or_else(|| eval_err("let", "each binding must be a (name value) pair"))?;
        if pair.len() != 2 {
            return Err(eval_err("let", "each binding must have exactly a name and a value"));
        }
        let name = pair[0]
            .as_str()
            .ok_or_else(|| eval_err("let", "binding name must be a symbol"))?
            .to_string();
        let value = eval(&pair[1], ctx)?;
        saved.push((name.clone(), ctx.vars.insert(name, value)));
    }

    let body_result = (|| {
        let mut result = Expr::Nil;
        for body in &args[1..] {
            result = eval(body, ctx)?;
        }
        Ok(result)
    })();

    for (name, previous) in saved.into_iter().rev() {
        match previous {
            Some(v) => {
                ctx.vars.insert(name, v);
            }
            None => {
                ctx.vars.remove(&name);
            }
        }
    }

    body_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_root;

    fn run(src: &str) -> Result<Expr> {
        let expr = parse_root(src).unwrap();
        let mut ctx = EvalContext::new(PathBuf::from("."));
        eval(&expr, &mut ctx)
    }

    #[test]
    fn if_picks_correct_branch() {
        assert_eq!(run("(if true 1 2)").unwrap(), Expr::Number(1.0));
        assert_eq!(run("(if false 1 2)").unwrap(), Expr::Number(2.0));
        assert_eq!(run("(if false 1)").unwrap(), Expr::Nil);
    }

    #[test]
    fn cond_returns_first_truthy_or_nil() {
        assert_eq!(run("(cond (false 1) (true 2) (true 3))").unwrap(), Expr::Number(2.0));
        assert_eq!(run("(cond (false 1))").unwrap(), Expr::Nil);
    }

    #[test]
    fn let_shadows_and_restores() {
        let mut ctx = EvalContext::new(PathBuf::from("."));
        ctx.vars.insert("x".into(), Expr::Number(1.0));
        let expr = parse_root("(let ((x 2)) x)").unwrap();
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Expr::Number(2.0));
        assert_eq!(ctx.vars.get("x"), Some(&Expr::Number(1.0)));
    }

    #[test]
    fn and_or_short_circuit_semantics() {
        assert_eq!(run("(and true true 3)").unwrap(), Expr::Number(3.0));
        assert_eq!(run("(and true false 3)").unwrap(), Expr::Bool(false));
        assert_eq!(run("(or false false 5)").unwrap(), Expr::Number(5.0));
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        assert!(run("undefined-var").is_err());
    }

    #[test]
    fn resolve_config_leaves_structural_tags_untouched() {
        let mut ctx = EvalContext::new(PathBuf::from("."));
        let expr = parse_root("(nodes (name \"m\") (roles controlplane etcd))").unwrap();
        let resolved = resolve_config(&expr, &mut ctx).unwrap();
        assert_eq!(resolved, expr);
    }

    #[test]
    fn resolve_config_evaluates_embedded_builtin_calls() {
        let mut ctx = EvalContext::new(PathBuf::from("."));
        let expr = parse_root("(metadata (name (concat \"c-\" \"1\")))").unwrap();
        let resolved = resolve_config(&expr, &mut ctx).unwrap();
        let metadata = resolved.as_list().unwrap();
        let name_field = metadata[1].as_list().unwrap();
        assert_eq!(name_field[1], Expr::Str("c-1".into()));
    }
}
