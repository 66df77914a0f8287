use mesh_definitions::Result;

use super::{arity_err, type_err};
use crate::expr::Expr;

fn s(name: &str, e: &Expr) -> Result<String> {
    e.as_str()
        .map(|v| v.to_string())
        .ok_or_else(|| type_err(name, "string", e))
}

pub fn call(name: &str, args: Vec<Expr>) -> Result<Expr> {
    match name {
        "concat" | "str" => {
            let mut out = String::new();
            for a in &args {
                out.push_str(&format!("{}", a));
            }
            Ok(Expr::Str(out))
        }
        "format" => format_builtin(args),
        "upper" => {
            let v = one_string(name, &args)?;
            Ok(Expr::Str(v.to_uppercase()))
        }
        "lower" => {
            let v = one_string(name, &args)?;
            Ok(Expr::Str(v.to_lowercase()))
        }
        "trim" => {
            let v = one_string(name, &args)?;
            Ok(Expr::Str(v.trim().to_string()))
        }
        "split" => {
            if args.len() != 2 {
                return Err(arity_err("split", "(split string sep)"));
            }
            let v = s("split", &args[0])?;
            let sep = s("split", &args[1])?;
            let items = v.split(sep.as_str()).map(|p| Expr::Str(p.to_string())).collect();
            Ok(Expr::list(items))
        }
        "join" => {
            if args.len() != 2 {
                return Err(arity_err("join", "(join list sep)"));
            }
            let items = args[0]
                .as_list()
                .ok_or_else(|| type_err("join", "list", &args[0]))?;
            let sep = s("join", &args[1])?;
            let joined = items
                .iter()
                .map(|i| format!("{}", i))
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Expr::Str(joined))
        }
        "replace" => {
            if args.len() != 3 {
                return Err(arity_err("replace", "(replace string from to)"));
            }
            let v = s("replace", &args[0])?;
            let from = s("replace", &args[1])?;
            let to = s("replace", &args[2])?;
            Ok(Expr::Str(v.replace(from.as_str(), &to)))
        }
        "substring" => substring(args),
        _ => unreachable!("dispatched only for string builtin names"),
    }
}

fn one_string(name: &str, args: &[Expr]) -> Result<String> {
    if args.len() != 1 {
        return Err(arity_err(name, "a single string argument"));
    }
    s(name, &args[0])
}

/// Positional `{0}`, `{1}`, ... replacement.
fn format_builtin(args: Vec<Expr>) -> Result<Expr> {
    if args.is_empty() {
        return Err(arity_err("format", "(format template args...)"));
    }
    let template = s("format", &args[0])?;
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if d == '}' {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            chars.next(); // consume '}'
            if let Ok(idx) = digits.parse::<usize>() {
                if let Some(replacement) = args.get(idx + 1) {
                    out.push_str(&format!("{}", replacement));
                    continue;
                }
            }
            out.push('{');
            out.push_str(&digits);
            out.push('}');
        } else {
            out.push(c);
        }
    }
    Ok(Expr::Str(out))
}

/// Clamps out-of-range indices rather than failing.
fn substring(args: Vec<Expr>) -> Result<Expr> {
    if args.len() != 3 {
        return Err(arity_err("substring", "(substring string start end)"));
    }
    let v: Vec<char> = s("substring", &args[0])?.chars().collect();
    let start = args[1].as_number().unwrap_or(0.0).max(0.0) as usize;
    let end = args[2].as_number().unwrap_or(v.len() as f64).max(0.0) as usize;
    let start = start.min(v.len());
    let end = end.min(v.len()).max(start);
    Ok(Expr::Str(v[start..end].iter().collect()))
}
