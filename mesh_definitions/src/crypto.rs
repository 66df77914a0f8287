//! Hashing helpers shared by the evaluator's `sha256`/`md5` built-ins and by
//! the orchestrator's cluster-token derivation.
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex(&hasher.finalize())
}

/// `md5` built-in stand-in. Per this MAY be implemented as a
/// truncated SHA-256 for provenance purposes and must never be used where
/// actual MD5 compatibility or any signature guarantee is required.
pub fn md5_stub_hex(input: &str) -> String {
    let full = sha256_hex(input);
    full[..32].to_string()
}

/// Derives the stack-stable cluster token: the first 32 hex
/// characters of `sha256("{clusterName}-{unix-time}-{unix-nanos}")`.
pub fn cluster_token(cluster_name: &str, unix_time: u64, unix_nanos: u32) -> String {
    let seed = format!("{}-{}-{}", cluster_name, unix_time, unix_nanos);
    sha256_hex(&seed)[..32].to_string()
}

fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic() {
        assert_eq!(sha256_hex("hello"), sha256_hex("hello"));
        assert_ne!(sha256_hex("hello"), sha256_hex("world"));
    }

    #[test]
    fn cluster_token_is_32_lowercase_hex_and_reproducible() {
        let a = cluster_token("test", 1_700_000_000, 0);
        let b = cluster_token("test", 1_700_000_000, 0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn cluster_token_seed_changes_output() {
        let a = cluster_token("test", 1_700_000_000, 0);
        let b = cluster_token("test", 1_700_000_000, 1);
        assert_ne!(a, b);
    }
}
