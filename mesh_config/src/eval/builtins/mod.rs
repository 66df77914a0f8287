//! Built-in function dispatch, grouped by kind. Special forms are
//! handled by `eval::eval` before arguments are evaluated; everything
//! reaching here is a regular function call with already-evaluated
//! arguments.
mod arith;
mod crypto_identity_time;
mod env_system_fs;
mod lists_types;
mod regex_builtin;
mod shell;
mod strings;

use mesh_definitions::{Error, ErrorKind, Result};

use crate::eval::EvalContext;
use crate::expr::Expr;

pub fn arity_err(name: &str, expected: &str) -> Error {
    ErrorKind::ConfigEvalError(name.to_string(), format!("expects {}", expected)).into()
}

pub fn type_err(name: &str, expected: &str, got: &Expr) -> Error {
    ErrorKind::ConfigEvalError(
        name.to_string(),
        format!("expects {}, got {}", expected, got.type_name()),
    )
    .into()
}

pub fn call(name: &str, args: Vec<Expr>, ctx: &mut EvalContext) -> Result<Expr> {
    match name {
        // Control (non-special-form members of the group)
        "not" => arith::not(args),
        "default" => arith::default(args),

        // Comparison / arithmetic
        "=" | "eq" | "!=" | "<" | ">" | "<=" | ">=" | "+" | "-" | "*" | "/" | "mod" => {
            arith::call(name, args)
        }

        // Strings
        "concat" | "str" | "format" | "upper" | "lower" | "trim" | "split" | "join"
        | "replace" | "substring" => strings::call(name, args),

        // Encoding / crypto / identity / time
        "base64-encode" | "base64-decode" | "sha256" | "md5" | "uuid" | "random-string"
        | "now" | "timestamp" | "date" | "time" => crypto_identity_time::call(name, args),

        // Environment / system / filesystem
        "env" | "env-or" | "env?" | "hostname" | "user" | "home" | "cwd" | "read-file"
        | "file-exists?" | "dirname" | "basename" | "expand-path" => {
            env_system_fs::call(name, args, ctx)
        }

        // Shell (trust boundary)
        "shell" => shell::call(args, ctx),

        // Variables (non-special-form helpers)
        "var" | "set" => arith::var_set(name, args, ctx),

        // Lists / types
        "list" | "first" | "rest" | "nth" | "len" | "append" | "range" | "string?"
        | "number?" | "bool?" | "list?" | "nil?" | "empty?" | "to-string" | "to-int"
        | "to-bool" => lists_types::call(name, args),

        // Regex
        "match" | "match?" => regex_builtin::call(name, args),

        other => Err(ErrorKind::ConfigEvalError(other.to_string(), "unknown symbol".into()).into()),
    }
}

/// Whether `name` dispatches to a real builtin here, as opposed to a
/// structural list head in a config tree (a section or field name).
pub fn is_known(name: &str) -> bool {
    matches!(
        name,
        "not" | "default"
            | "="
            | "eq"
            | "!="
            | "<"
            | ">"
            | "<="
            | ">="
            | "+"
            | "-"
            | "*"
            | "/"
            | "mod"
            | "concat"
            | "str"
            | "format"
            | "upper"
            | "lower"
            | "trim"
            | "split"
            | "join"
            | "replace"
            | "substring"
            | "base64-encode"
            | "base64-decode"
            | "sha256"
            | "md5"
            | "uuid"
            | "random-string"
            | "now"
            | "timestamp"
            | "date"
            | "time"
            | "env"
            | "env-or"
            | "env?"
            | "hostname"
            | "user"
            | "home"
            | "cwd"
            | "read-file"
            | "file-exists?"
            | "dirname"
            | "basename"
            | "expand-path"
            | "shell"
            | "var"
            | "set"
            | "list"
            | "first"
            | "rest"
            | "nth"
            | "len"
            | "append"
            | "range"
            | "string?"
            | "number?"
            | "bool?"
            | "list?"
            | "nil?"
            | "empty?"
            | "to-string"
            | "to-int"
            | "to-bool"
            | "match"
            | "match?"
    )
}
