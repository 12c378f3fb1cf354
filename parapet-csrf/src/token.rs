//! Token generation primitives.

use crate::error::{CsrfError, CsrfResult};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

/// One anti-forgery token issuance.
///
/// The `name` identifies the issuance in storage; the `value` is the secret
/// the client must echo back. A value only means something paired with its
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub name: String,
    pub value: String,
}

impl TokenPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Generate a token value of `strength` random bytes, hex-encoded.
///
/// Randomness comes from the OS entropy source; if that source is
/// unavailable the error is fatal and there is no weaker fallback.
pub fn create_value(strength: usize) -> CsrfResult<String> {
    let mut bytes = vec![0u8; strength];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CsrfError::RandomSource(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Generate a storage key for one issuance, scoped to `prefix`.
///
/// Names must be unique across concurrent calls, not secret.
pub fn create_name(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

/// Constant-time string comparison (prevent timing attacks)
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_length_matches_strength() {
        let value = create_value(16).unwrap();
        // Hex encoding doubles the byte length
        assert_eq!(value.len(), 32);

        let value = create_value(32).unwrap();
        assert_eq!(value.len(), 64);
    }

    #[test]
    fn test_values_are_distinct() {
        assert_ne!(create_value(16).unwrap(), create_value(16).unwrap());
    }

    #[test]
    fn test_names_are_distinct_and_prefixed() {
        let a = create_name("csrf");
        let b = create_name("csrf");

        assert_ne!(a, b);
        assert!(a.starts_with("csrf"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }
}
