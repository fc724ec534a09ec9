//! Request signing verification.
//!
//! When a SECURITY_KEY is configured, requests must carry a hash proving
//! the producer knows the key. The digest is MD5 over
//! `secret || key || json(edits)`, hex encoded, which keeps existing URL
//! producers working unchanged. The edit map serializes with insertion
//! order preserved, so producer and verifier agree on the canonical form.

use md5::{Digest, Md5};

use crate::error::HandlerError;
use crate::request::EditMap;

/// Verifies the request hash against the configured signing secret.
///
/// A missing secret disables signing entirely. Comparison is exact on the
/// hex encoding (case-sensitive).
pub fn verify(
    key: &str,
    edits: &EditMap,
    supplied_hash: Option<&str>,
    secret: Option<&str>,
) -> Result<(), HandlerError> {
    let secret = match secret {
        Some(secret) => secret,
        None => return Ok(()),
    };

    let supplied = supplied_hash.ok_or(HandlerError::MissingHash)?;

    if supplied == compute_hash(key, edits, secret) {
        Ok(())
    } else {
        Err(HandlerError::HashMismatch)
    }
}

/// Computes the hex digest request producers are expected to send.
pub fn compute_hash(key: &str, edits: &EditMap, secret: &str) -> String {
    let edits_json = serde_json::to_string(edits).unwrap_or_else(|_| "{}".to_string());

    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    hasher.update(key.as_bytes());
    hasher.update(edits_json.as_bytes());

    hex::encode(hasher.finalize())
}
