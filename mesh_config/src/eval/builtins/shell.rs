use std::process::Command;

use mesh_definitions::{ErrorKind, Result};

use super::{arity_err, type_err};
use crate::eval::EvalContext;
use crate::expr::Expr;

/// Substrings that are never allowed inside a `(shell ...)` command,
/// regardless of `ctx.strict`. This is a deny-list, not a sandbox: it
/// catches the obvious footguns, it does not make arbitrary shell
/// execution safe.
const DENY_SUBSTRINGS: &[&str] = &[
    "rm -rf /",
    "mkfs",
    "dd if=",
    ":(){ :|:& };:",
];

fn is_denied(command: &str) -> Option<&'static str> {
    DENY_SUBSTRINGS.iter().find(|d| command.contains(*d)).copied()
}

pub fn call(args: Vec<Expr>, ctx: &mut EvalContext) -> Result<Expr> {
    if args.len() != 1 {
        return Err(arity_err("shell", "(shell command)"));
    }
    let command = args[0]
        .as_str()
        .ok_or_else(|| type_err("shell", "string", &args[0]))?;

    if ctx.strict {
        return Err(ErrorKind::ConfigEvalError(
            "shell".to_string(),
            "shell execution is forbidden in strict mode".to_string(),
        )
        .into());
    }

    if let Some(hit) = is_denied(command) {
        return Err(ErrorKind::ConfigEvalError(
            "shell".to_string(),
            format!("command denied: contains '{}'", hit),
        )
        .into());
    }

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| ErrorKind::ConfigEvalError("shell".to_string(), e.to_string()))?;

    if !output.status.success() {
        return Err(ErrorKind::ConfigEvalError(
            "shell".to_string(),
            format!(
                "command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        )
        .into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(Expr::Str(stdout))
}
