use mesh_definitions::{ErrorKind, Result};

use super::{arity_err, type_err};
use crate::expr::Expr;

pub fn call(name: &str, args: Vec<Expr>) -> Result<Expr> {
    match name {
        "list" => Ok(Expr::list(args)),
        "first" => {
            let items = one_list(name, &args)?;
            Ok(items.first().cloned().unwrap_or(Expr::Nil))
        }
        "rest" => {
            let items = one_list(name, &args)?;
            Ok(Expr::list(items.iter().skip(1).cloned().collect()))
        }
        "nth" => {
            if args.len() != 2 {
                return Err(arity_err("nth", "(nth list index)"));
            }
            let items = args[0]
                .as_list()
                .ok_or_else(|| type_err("nth", "list", &args[0]))?;
            let idx = args[1].as_number().unwrap_or(-1.0);
            if idx < 0.0 {
                return Err(type_err("nth", "non-negative index", &args[1]));
            }
            Ok(items.get(idx as usize).cloned().unwrap_or(Expr::Nil))
        }
        "len" => {
            if args.len() != 1 {
                return Err(arity_err("len", "(len list-or-string)"));
            }
            let n = match &args[0] {
                Expr::List(items) => items.len(),
                Expr::Str(s) => s.chars().count(),
                other => return Err(type_err("len", "list or string", other)),
            };
            Ok(Expr::Number(n as f64))
        }
        "append" => {
            if args.len() != 2 {
                return Err(arity_err("append", "(append list item)"));
            }
            let items = args[0]
                .as_list()
                .ok_or_else(|| type_err("append", "list", &args[0]))?;
            let mut out = items.to_vec();
            out.push(args[1].clone());
            Ok(Expr::list(out))
        }
        "range" => range(args),
        "string?" => Ok(Expr::Bool(matches!(args.first(), Some(Expr::Str(_))))),
        "number?" => Ok(Expr::Bool(matches!(args.first(), Some(Expr::Number(_))))),
        "bool?" => Ok(Expr::Bool(matches!(args.first(), Some(Expr::Bool(_))))),
        "list?" => Ok(Expr::Bool(matches!(args.first(), Some(Expr::List(_))))),
        "nil?" => Ok(Expr::Bool(matches!(args.first(), Some(Expr::Nil) | None))),
        "empty?" => {
            if args.len() != 1 {
                return Err(arity_err("empty?", "(empty? list-or-string)"));
            }
            let empty = match &args[0] {
                Expr::List(items) => items.is_empty(),
                Expr::Str(s) => s.is_empty(),
                Expr::Nil => true,
                other => return Err(type_err("empty?", "list or string", other)),
            };
            Ok(Expr::Bool(empty))
        }
        "to-string" => {
            let v = args.first().cloned().unwrap_or(Expr::Nil);
            Ok(Expr::Str(format!("{}", v)))
        }
        "to-int" => {
            if args.len() != 1 {
                return Err(arity_err("to-int", "(to-int value)"));
            }
            let n = coerce_number(&args[0])?;
            Ok(Expr::Number(n.trunc()))
        }
        "to-bool" => {
            let v = args.first().cloned().unwrap_or(Expr::Nil);
            Ok(Expr::Bool(v.is_truthy()))
        }
        _ => unreachable!("dispatched only for list/type builtin names"),
    }
}

fn one_list(name: &str, args: &[Expr]) -> Result<Vec<Expr>> {
    if args.len() != 1 {
        return Err(arity_err(name, "a single list argument"));
    }
    args[0]
        .as_list()
        .map(|items| items.to_vec())
        .ok_or_else(|| type_err(name, "list", &args[0]))
}

fn coerce_number(e: &Expr) -> Result<f64> {
    match e {
        Expr::Number(n) => Ok(*n),
        Expr::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| type_err("to-int", "number or numeric string", e)),
        other => Err(type_err("to-int", "number or numeric string", other)),
    }
}

/// `(range start end [step])`, half-open `[start, end)`. Rejects a zero
/// step rather than looping forever.
fn range(args: Vec<Expr>) -> Result<Expr> {
    if args.len() < 2 || args.len() > 3 {
        return Err(arity_err("range", "(range start end [step])"));
    }
    let start = args[0].as_number().ok_or_else(|| type_err("range", "number", &args[0]))?;
    let end = args[1].as_number().ok_or_else(|| type_err("range", "number", &args[1]))?;
    let step = if args.len() == 3 {
        args[2].as_number().ok_or_else(|| type_err("range", "number", &args[2]))?
    } else {
        1.0
    };
    if step == 0.0 {
        return Err(ErrorKind::ConfigEvalError(
            "range".to_string(),
            "step must not be zero".to_string(),
        )
        .into());
    }
    let mut out = Vec::new();
    let mut cur = start;
    if step > 0.0 {
        while cur < end {
            out.push(Expr::Number(cur));
            cur += step;
        }
    } else {
        while cur > end {
            out.push(Expr::Number(cur));
            cur += step;
        }
    }
    Ok(Expr::list(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_zero_step() {
        let err = call("range", vec![Expr::Number(0.0), Expr::Number(5.0), Expr::Number(0.0)])
            .unwrap_err();
        assert!(format!("{}", err).contains("step"));
    }

    #[test]
    fn range_builds_half_open_interval() {
        let v = call("range", vec![Expr::Number(0.0), Expr::Number(3.0)]).unwrap();
        let items = v.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], Expr::Number(2.0));
    }

    #[test]
    fn nth_out_of_bounds_is_nil() {
        let list = Expr::list(vec![Expr::Number(1.0)]);
        let v = call("nth", vec![list, Expr::Number(5.0)]).unwrap();
        assert_eq!(v, Expr::Nil);
    }
}
