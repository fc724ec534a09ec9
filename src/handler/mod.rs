//! Request handler.
//!
//! Ties the stages together: decode the path, verify the signature,
//! authorize the bucket, fetch the original, enforce the size policy,
//! apply the edits and encode the response. Every outcome, success or
//! failure, is rendered as an [`ApiResponse`].

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{Config, ConfigSource};
use crate::error::HandlerError;
use crate::pipeline;
use crate::request::{self, bucket, format, resize};
use crate::security;
use crate::storage::{ObjectStore, StoreError, StoredObject};

/// The finished response, shaped for an API-gateway style transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

struct ProcessedImage {
    bytes: Vec<u8>,
    content_type: String,
    cache_control: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
}

/// Handles one image request end to end.
pub async fn handle(
    path: Option<&str>,
    query_params: &HashMap<String, Vec<String>>,
    headers: &HashMap<String, String>,
    store: &dyn ObjectStore,
    config_source: &dyn ConfigSource,
) -> ApiResponse {
    let config = Config::load(config_source);

    match run(path, query_params, headers, store, &config).await {
        Ok(image) => {
            info!(
                content_type = %image.content_type,
                size = image.bytes.len(),
                "request served"
            );
            success_response(image, &config)
        }
        Err(err) => {
            warn!(status = err.status(), code = %err.code(), "request failed");
            error_response(&err, &config)
        }
    }
}

async fn run(
    path: Option<&str>,
    query_params: &HashMap<String, Vec<String>>,
    headers: &HashMap<String, String>,
    store: &dyn ObjectStore,
    config: &Config,
) -> Result<ProcessedImage, HandlerError> {
    let decoded = request::decode(path, query_params)?;

    // The signature covers the edits exactly as the client sent them,
    // before any policy rewriting.
    security::verify(
        &decoded.key,
        &decoded.edits,
        decoded.hash.as_deref(),
        config.security_key.as_deref(),
    )?;

    let bucket = bucket::resolve(decoded.bucket.as_deref(), &config.source_buckets)?;

    let original = fetch_original(store, &bucket, &decoded.key).await?;

    let edits = resize::apply_policy(decoded.edits, config)?;

    let handle = pipeline::apply_edits(&original.bytes, &edits, store).await?;

    let output_format = format::negotiate(
        header_value(headers, "accept"),
        decoded.output_format.as_deref(),
        config.auto_webp,
    )
    .unwrap_or_else(|| handle.format_name());

    let bytes = handle.to_bytes(&output_format)?;

    Ok(ProcessedImage {
        bytes,
        content_type: content_type_for(&output_format),
        cache_control: original.cache_control,
        last_modified: original.last_modified,
        expires: original.expires,
    })
}

async fn fetch_original(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<StoredObject, HandlerError> {
    store.get(bucket, key).await.map_err(|err| match err {
        StoreError::NotFound { code, message } => HandlerError::NotFound { code, message },
        StoreError::AccessDenied { code, message } | StoreError::Other { code, message } => {
            HandlerError::OriginalFetch { code, message }
        }
    })
}

fn success_response(image: ProcessedImage, config: &Config) -> ApiResponse {
    let mut headers = common_headers(config);
    headers.insert("Content-Type".to_string(), image.content_type);
    if let Some(cache_control) = image.cache_control {
        headers.insert("Cache-Control".to_string(), cache_control);
    }
    if let Some(last_modified) = image.last_modified {
        headers.insert("Last-Modified".to_string(), http_date(&last_modified));
    }
    if let Some(expires) = image.expires {
        headers.insert("Expires".to_string(), http_date(&expires));
    }

    ApiResponse {
        status_code: 200,
        headers,
        body: BASE64.encode(image.bytes),
        is_base64_encoded: true,
    }
}

fn error_response(err: &HandlerError, config: &Config) -> ApiResponse {
    let mut headers = common_headers(config);
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    ApiResponse {
        status_code: err.status(),
        headers,
        body: err.to_body(),
        is_base64_encoded: false,
    }
}

/// CORS headers attached to every response. The allow-origin header is
/// only present when CORS is enabled and an origin is configured.
fn common_headers(config: &Config) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Access-Control-Allow-Methods".to_string(), "GET".to_string());
    headers.insert(
        "Access-Control-Allow-Headers".to_string(),
        "Content-Type, Authorization".to_string(),
    );
    headers.insert(
        "Access-Control-Allow-Credentials".to_string(),
        "true".to_string(),
    );
    if config.cors_enabled {
        if let Some(origin) = &config.cors_origin {
            headers.insert("Access-Control-Allow-Origin".to_string(), origin.clone());
        }
    }
    headers
}

fn content_type_for(format: &str) -> String {
    match format {
        "jpeg" | "jpg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "webp" => "image/webp".to_string(),
        "gif" => "image/gif".to_string(),
        other => format!("image/{}", other),
    }
}

fn http_date(stamp: &DateTime<Utc>) -> String {
    stamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
