//! Tenant namespace identifier validation.
//!
//! Namespaces partition cache and state per tenant in the registry façade
//! and orchestrator. Validation failures are a 400-class rejection, never
//! forwarded to the registry or filesystem.

use crate::error::Error;

const MAX_LEN: usize = 64;

/// Validates a namespace identifier against `[A-Za-z0-9_-]{1,64}`, then
/// rejects every documented path-traversal form even if it would otherwise
/// match that character class after decoding (`..` alone already fails the
/// class, but percent-encoded and backslash variants are checked
/// explicitly so a caller that forgot to decode first still gets caught).
pub fn validate(namespace: &str) -> Result<(), Error> {
    if namespace.is_empty() || namespace.len() > MAX_LEN {
        return Err(reject(namespace, "length must be 1-64"));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(reject(namespace, "must match [A-Za-z0-9_-]{1,64}"));
    }
    if namespace.contains("..") {
        return Err(reject(namespace, "contains a path traversal sequence"));
    }
    for forbidden in ["%2f", "%2F", "%5c", "%5C", "\0"] {
        if namespace.contains(forbidden) {
            return Err(reject(namespace, "contains an encoded path separator"));
        }
    }
    if namespace.chars().any(|c| c.is_control()) {
        return Err(reject(namespace, "contains a control character"));
    }
    if !namespace.is_ascii() {
        return Err(reject(namespace, "contains non-ASCII characters"));
    }
    Ok(())
}

fn reject(namespace: &str, reason: &str) -> Error {
    Error::Validation(format!("invalid namespace '{}': {}", namespace, reason))
}
