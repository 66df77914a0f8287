use chrono::Utc;
use mesh_definitions::{crypto, ErrorKind, Result};
use rand::Rng;

use super::{arity_err, type_err};
use crate::expr::Expr;

fn s(name: &str, e: &Expr) -> Result<String> {
    e.as_str()
        .map(|v| v.to_string())
        .ok_or_else(|| type_err(name, "string", e))
}

pub fn call(name: &str, args: Vec<Expr>) -> Result<Expr> {
    match name {
        "base64-encode" => {
            let v = one_string(name, &args)?;
            Ok(Expr::Str(base64::encode(v)))
        }
        "base64-decode" => {
            let v = one_string(name, &args)?;
            let bytes = base64::decode(&v).map_err(|e| {
                ErrorKind::ConfigEvalError(name.to_string(), format!("invalid base64: {}", e))
            })?;
            let decoded = String::from_utf8(bytes).map_err(|e| {
                ErrorKind::ConfigEvalError(name.to_string(), format!("invalid utf-8: {}", e))
            })?;
            Ok(Expr::Str(decoded))
        }
        "sha256" => {
            let v = one_string(name, &args)?;
            Ok(Expr::Str(crypto::sha256_hex(&v)))
        }
        "md5" => {
            let v = one_string(name, &args)?;
            Ok(Expr::Str(crypto::md5_stub_hex(&v)))
        }
        "uuid" => Ok(Expr::Str(uuid::Uuid::new_v4().to_string())),
        "random-string" => {
            let len = if args.is_empty() {
                16
            } else {
                args[0].as_number().unwrap_or(16.0) as usize
            };
            const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
            let mut rng = rand::thread_rng();
            let out: String = (0..len)
                .map(|_| ALPHABET[rng.gen_range(0, ALPHABET.len())] as char)
                .collect();
            Ok(Expr::Str(out))
        }
        "now" => Ok(Expr::Str(Utc::now().to_rfc3339())),
        "timestamp" => Ok(Expr::Number(Utc::now().timestamp() as f64)),
        "date" => Ok(Expr::Str(Utc::now().format("%Y-%m-%d").to_string())),
        "time" => Ok(Expr::Str(Utc::now().format("%H:%M:%S").to_string())),
        _ => unreachable!("dispatched only for crypto/identity/time builtin names"),
    }
}

fn one_string(name: &str, args: &[Expr]) -> Result<String> {
    if args.len() != 1 {
        return Err(arity_err(name, "a single string argument"));
    }
    s(name, &args[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trips() {
        let encoded = call("base64-encode", vec![Expr::Str("hello world".into())]).unwrap();
        let decoded = call("base64-decode", vec![encoded]).unwrap();
        assert_eq!(decoded, Expr::Str("hello world".into()));
    }

    #[test]
    fn sha256_is_deterministic() {
        let a = call("sha256", vec![Expr::Str("x".into())]).unwrap();
        let b = call("sha256", vec![Expr::Str("x".into())]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn random_string_has_requested_length() {
        let v = call("random-string", vec![Expr::Number(10.0)]).unwrap();
        assert_eq!(v.as_str().unwrap().len(), 10);
    }
}
