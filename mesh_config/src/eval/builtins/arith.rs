use mesh_definitions::{ErrorKind, Result};

use super::{arity_err, type_err};
use crate::eval::EvalContext;
use crate::expr::Expr;

fn num(name: &str, e: &Expr) -> Result<f64> {
    e.as_number().ok_or_else(|| type_err(name, "number", e))
}

pub fn call(name: &str, args: Vec<Expr>) -> Result<Expr> {
    match name {
        "=" | "eq" => {
            if args.len() != 2 {
                return Err(arity_err(name, "(= a b)"));
            }
            Ok(Expr::Bool(args[0] == args[1]))
        }
        "!=" => {
            if args.len() != 2 {
                return Err(arity_err(name, "(!= a b)"));
            }
            Ok(Expr::Bool(args[0] != args[1]))
        }
        "<" | ">" | "<=" | ">=" => {
            if args.len() != 2 {
                return Err(arity_err(name, "(op a b)"));
            }
            let a = num(name, &args[0])?;
            let b = num(name, &args[1])?;
            let result = match name {
                "<" => a < b,
                ">" => a > b,
                "<=" => a <= b,
                ">=" => a >= b,
                _ => unreachable!(),
            };
            Ok(Expr::Bool(result))
        }
        "+" | "-" | "*" => {
            if args.is_empty() {
                return Err(arity_err(name, "at least one numeric argument"));
            }
            let mut nums = args.iter();
            let mut acc = num(name, nums.next().unwrap())?;
            for rest in nums {
                let v = num(name, rest)?;
                acc = match name {
                    "+" => acc + v,
                    "-" => acc - v,
                    "*" => acc * v,
                    _ => unreachable!(),
                };
            }
            Ok(Expr::Number(acc))
        }
        "/" => {
            if args.len() != 2 {
                return Err(arity_err(name, "(/ a b)"));
            }
            let a = num(name, &args[0])?;
            let b = num(name, &args[1])?;
            if b == 0.0 {
                return Err(ErrorKind::ConfigEvalError(
                    "/".to_string(),
                    "division by zero".to_string(),
                )
                .into());
            }
            Ok(Expr::Number(a / b))
        }
        "mod" => {
            if args.len() != 2 {
                return Err(arity_err(name, "(mod a b)"));
            }
            let a = num(name, &args[0])?;
            let b = num(name, &args[1])?;
            if b == 0.0 {
                return Err(ErrorKind::ConfigEvalError(
                    "mod".to_string(),
                    "division by zero".to_string(),
                )
                .into());
            }
            Ok(Expr::Number(a % b))
        }
        _ => unreachable!("dispatched only for arithmetic/comparison names"),
    }
}

pub fn not(args: Vec<Expr>) -> Result<Expr> {
    if args.len() != 1 {
        return Err(arity_err("not", "(not x)"));
    }
    Ok(Expr::Bool(!args[0].is_truthy()))
}

/// `(default a b)`: returns `a` unless it is nil, in which case `b`.
pub fn default(args: Vec<Expr>) -> Result<Expr> {
    if args.len() != 2 {
        return Err(arity_err("default", "(default value fallback)"));
    }
    if args[0] == Expr::Nil {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

pub fn var_set(name: &str, args: Vec<Expr>, ctx: &mut EvalContext) -> Result<Expr> {
    match name {
        "var" => {
            if args.len() != 1 {
                return Err(arity_err("var", "(var name)"));
            }
            let key = args[0]
                .as_str()
                .ok_or_else(|| type_err("var", "string/symbol name", &args[0]))?;
            Ok(ctx.vars.get(key).cloned().unwrap_or(Expr::Nil))
        }
        "set" => {
            if args.len() != 2 {
                return Err(arity_err("set", "(set name value)"));
            }
            let key = args[0]
                .as_str()
                .ok_or_else(|| type_err("set", "string/symbol name", &args[0]))?
                .to_string();
            ctx.vars.insert(key, args[1].clone());
            Ok(args[1].clone())
        }
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_is_domain_error() {
        let err = call("/", vec![Expr::Number(5.0), Expr::Number(0.0)]).unwrap_err();
        assert!(format!("{}", err).contains("division by zero"));
    }

    #[test]
    fn arithmetic_folds_left_to_right() {
        assert_eq!(
            call("-", vec![Expr::Number(10.0), Expr::Number(3.0), Expr::Number(2.0)]).unwrap(),
            Expr::Number(5.0)
        );
    }
}
