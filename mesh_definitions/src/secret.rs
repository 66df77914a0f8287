//! Opaque secret values.
//!
//! Every private key, auth key and admin API key that flows through the
//! orchestrator is wrapped in `Secret` rather than carried as a plain
//! `String`. `Debug`, `Display` and `Serialize` all redact the payload so
//! that a stray `{:?}` in a log line or a serialized output can never leak
//! it. Only `expose()` returns the real value, and call sites that use it
//! are expected to hand the result straight to an adapter, never to a
//! `log!`/`println!` call.
use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

const REDACTED: &str = "***REDACTED***";

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Secret(value.into())
    }

    /// Returns the underlying value. Callers must not log or serialize it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Secret(s)
    }
}

impl<'de> serde::Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Secret(s))
    }
}
