use regex::Regex;

use mesh_definitions::{ErrorKind, Result};

use super::{arity_err, type_err};
use crate::expr::Expr;

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ErrorKind::ConfigEvalError(name.to_string(), format!("invalid regex: {}", e)).into())
}

pub fn call(name: &str, args: Vec<Expr>) -> Result<Expr> {
    if args.len() != 2 {
        return Err(arity_err(name, "(match|match? string pattern)"));
    }
    let subject = args[0]
        .as_str()
        .ok_or_else(|| type_err(name, "string", &args[0]))?;
    let pattern = args[1]
        .as_str()
        .ok_or_else(|| type_err(name, "string", &args[1]))?;
    let re = compile(name, pattern)?;

    match name {
        "match?" => Ok(Expr::Bool(re.is_match(subject))),
        "match" => match re.captures(subject) {
            None => Ok(Expr::Nil),
            Some(caps) => {
                let mut out = Vec::with_capacity(caps.len());
                for m in caps.iter() {
                    out.push(match m {
                        Some(m) => Expr::Str(m.as_str().to_string()),
                        None => Expr::Nil,
                    });
                }
                Ok(Expr::list(out))
            }
        },
        _ => unreachable!("dispatched only for regex builtin names"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_returns_full_match_and_groups() {
        let v = call(
            "match",
            vec![Expr::Str("host-03".into()), Expr::Str(r"host-(\d+)".into())],
        )
        .unwrap();
        let items = v.as_list().unwrap();
        assert_eq!(items[0], Expr::Str("host-03".into()));
        assert_eq!(items[1], Expr::Str("03".into()));
    }

    #[test]
    fn match_question_is_boolean() {
        let v = call("match?", vec![Expr::Str("abc".into()), Expr::Str("^a".into())]).unwrap();
        assert_eq!(v, Expr::Bool(true));
    }

    #[test]
    fn no_match_returns_nil() {
        let v = call("match", vec![Expr::Str("abc".into()), Expr::Str("^z".into())]).unwrap();
        assert_eq!(v, Expr::Nil);
    }
}
