use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use mesh_definitions::Result;

use super::{arity_err, type_err};
use crate::eval::EvalContext;
use crate::expr::Expr;

fn s(name: &str, e: &Expr) -> Result<String> {
    e.as_str()
        .map(|v| v.to_string())
        .ok_or_else(|| type_err(name, "string", e))
}

/// `~` prefix expands to home; relative paths resolve against the
/// evaluator's working directory.
fn resolve_path(ctx: &EvalContext, raw: &str) -> PathBuf {
    if let Some(stripped) = raw.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let stripped = stripped.trim_start_matches('/');
        return home.join(stripped);
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        ctx.cwd.join(path)
    }
}

pub fn call(name: &str, args: Vec<Expr>, ctx: &mut EvalContext) -> Result<Expr> {
    match name {
        "env" => {
            if args.is_empty() || args.len() > 2 {
                return Err(arity_err("env", "(env name [default])"));
            }
            let key = s("env", &args[0])?;
            let explicit_default = args.get(1).map(|d| s("env", d)).transpose()?;
            match env::var(&key) {
                Ok(v) => Ok(Expr::Str(v)),
                Err(_) => {
                    if explicit_default.is_none() && ctx.strict {
                        ctx.record_issue(format!(
                            "env variable '{}' is not set and no default was given; evaluated to an empty string",
                            key
                        ));
                    }
                    Ok(Expr::Str(explicit_default.unwrap_or_default()))
                }
            }
        }
        "env-or" => {
            if args.len() != 2 {
                return Err(arity_err("env-or", "(env-or name default)"));
            }
            let key = s("env-or", &args[0])?;
            let default = s("env-or", &args[1])?;
            Ok(Expr::Str(env::var(&key).unwrap_or(default)))
        }
        "env?" => {
            if args.len() != 1 {
                return Err(arity_err("env?", "(env? name)"));
            }
            let key = s("env?", &args[0])?;
            Ok(Expr::Bool(env::var(&key).is_ok()))
        }
        "hostname" => Ok(Expr::Str(
            hostname_or_default().unwrap_or_else(|| "localhost".into()),
        )),
        "user" => Ok(Expr::Str(env::var("USER").unwrap_or_default())),
        "home" => Ok(Expr::Str(
            dirs::home_dir().map(|p| p.display().to_string()).unwrap_or_default(),
        )),
        "cwd" => Ok(Expr::Str(ctx.cwd.display().to_string())),
        "read-file" => {
            let raw = one_string("read-file", &args)?;
            let path = resolve_path(ctx, &raw);
            let contents = fs::read_to_string(&path)?;
            Ok(Expr::Str(contents))
        }
        "file-exists?" => {
            let raw = one_string("file-exists?", &args)?;
            let path = resolve_path(ctx, &raw);
            Ok(Expr::Bool(path.exists()))
        }
        "dirname" => {
            let raw = one_string("dirname", &args)?;
            let parent = Path::new(&raw).parent().map(|p| p.display().to_string()).unwrap_or_default();
            Ok(Expr::Str(parent))
        }
        "basename" => {
            let raw = one_string("basename", &args)?;
            let base = Path::new(&raw)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Expr::Str(base))
        }
        "expand-path" => {
            let raw = one_string("expand-path", &args)?;
            Ok(Expr::Str(resolve_path(ctx, &raw).display().to_string()))
        }
        _ => unreachable!("dispatched only for env/system/fs builtin names"),
    }
}

fn one_string(name: &str, args: &[Expr]) -> Result<String> {
    if args.len() != 1 {
        return Err(arity_err(name, "a single string argument"));
    }
    s(name, &args[0])
}

fn hostname_or_default() -> Option<String> {
    env::var("HOSTNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn env_missing_with_no_default_returns_empty_string() {
        let mut ctx = EvalContext::new(PathBuf::from("."));
        let v = call("env", vec![Expr::Str("MESHCTL_TEST_MISSING_VAR".into())], &mut ctx).unwrap();
        assert_eq!(v, Expr::Str(String::new()));
    }

    #[test]
    fn env_missing_in_strict_mode_records_a_non_fatal_issue() {
        let mut ctx = EvalContext::new(PathBuf::from(".")).strict(true);
        let v = call("env", vec![Expr::Str("MESHCTL_TEST_MISSING_VAR".into())], &mut ctx).unwrap();
        assert_eq!(v, Expr::Str(String::new()));
        assert_eq!(ctx.errors.len(), 1);
        assert!(ctx.errors[0].contains("MESHCTL_TEST_MISSING_VAR"));
    }

    #[test]
    fn env_missing_with_explicit_default_records_no_issue_even_in_strict_mode() {
        let mut ctx = EvalContext::new(PathBuf::from(".")).strict(true);
        let v = call(
            "env",
            vec![Expr::Str("MESHCTL_TEST_MISSING_VAR".into()), Expr::Str("fallback".into())],
            &mut ctx,
        )
        .unwrap();
        assert_eq!(v, Expr::Str("fallback".into()));
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn expand_path_resolves_relative_against_cwd() {
        let mut ctx = EvalContext::new(PathBuf::from("/tmp/base"));
        let v = call("expand-path", vec![Expr::Str("sub/file.txt".into())], &mut ctx).unwrap();
        assert_eq!(v, Expr::Str("/tmp/base/sub/file.txt".into()));
    }
}
