//! Request decoding.
//!
//! Incoming paths arrive in one of two encodings:
//!
//! - legacy: the whole path is a base64-encoded JSON object
//!   (`/eyJidWNrZXQiOi...`)
//! - modern: the path is a URL-encoded JSON object
//!   (`/%7B%22bucket%22%3A...%7D`)
//!
//! The decoder classifies the path, decodes it into a [`DecodedRequest`],
//! and rejects anything else. Favicon requests short-circuit to 404 before
//! any processing.

pub mod bucket;
pub mod format;
pub mod resize;

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;

use crate::error::HandlerError;

/// Ordered mapping of edit-name to edit-parameters. Iteration order is
/// insertion order (serde_json `preserve_order`), which is also the order
/// edits are applied in.
pub type EditMap = serde_json::Map<String, serde_json::Value>;

/// A fully decoded image request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRequest {
    pub bucket: Option<String>,
    pub key: String,
    pub edits: EditMap,
    /// Requested output format, overriding content negotiation.
    pub output_format: Option<String>,
    /// Signing hash, from the payload or the `hash` query parameter.
    pub hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestPayload {
    bucket: Option<String>,
    key: Option<String>,
    #[serde(default)]
    edits: EditMap,
    #[serde(rename = "outputFormat")]
    output_format: Option<String>,
    hash: Option<String>,
}

/// Path encoding scheme, decided by shape alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Base64,
    Json,
}

/// Decodes the request path into a structured request.
///
/// `query_params` is the multi-valued query string map; only the first
/// `hash` value is consulted.
pub fn decode(
    path: Option<&str>,
    query_params: &HashMap<String, Vec<String>>,
) -> Result<DecodedRequest, HandlerError> {
    let path = path.ok_or(HandlerError::MissingPath)?;
    let kind = classify(path)?;

    let stripped = path.strip_prefix('/').unwrap_or(path);

    let body = match kind {
        RequestKind::Base64 => {
            let decoded = BASE64
                .decode(stripped)
                .map_err(|_| HandlerError::Decode)?;
            String::from_utf8(decoded).map_err(|_| HandlerError::Decode)?
        }
        RequestKind::Json => urlencoding::decode(stripped)
            .map_err(|_| HandlerError::Decode)?
            .into_owned(),
    };

    let payload: RequestPayload =
        serde_json::from_str(&body).map_err(|_| HandlerError::Decode)?;

    // A payload without a key would otherwise propagate an undefined key
    // into the storage lookup; reject it up front.
    let key = payload.key.ok_or(HandlerError::MissingKey)?;

    let hash = payload
        .hash
        .or_else(|| query_hash(query_params));

    Ok(DecodedRequest {
        bucket: payload.bucket,
        key,
        edits: payload.edits,
        output_format: payload.output_format,
        hash,
    })
}

/// Classifies the path against the known shapes, in order: base64 charset,
/// URL-decoded JSON object, favicon literal.
fn classify(path: &str) -> Result<RequestKind, HandlerError> {
    let match_base64 = Regex::new(
        r"^(/?)([0-9a-zA-Z+/]{4})*(([0-9a-zA-Z+/]{2}==)|([0-9a-zA-Z+/]{3}=))?$",
    )
    .expect("base64 pattern is valid");
    let match_json = Regex::new(r"(\{.*:)?\{.*:.*\}(\})?").expect("json pattern is valid");
    let match_favicon = Regex::new(r"^(/?)favicon\.ico$").expect("favicon pattern is valid");

    if match_base64.is_match(path) {
        return Ok(RequestKind::Base64);
    }

    let url_decoded = urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string());
    if match_json.is_match(&url_decoded) {
        return Ok(RequestKind::Json);
    }

    if match_favicon.is_match(path) {
        // Favicon requests are always rejected as not-found, without
        // touching storage or configuration.
        return Err(HandlerError::NotFound {
            code: "Not Found".to_string(),
            message: String::new(),
        });
    }

    Err(HandlerError::RequestType)
}

fn query_hash(query_params: &HashMap<String, Vec<String>>) -> Option<String> {
    query_params
        .get("hash")
        .and_then(|values| values.first())
        .cloned()
}
