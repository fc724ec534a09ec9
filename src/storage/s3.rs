//! S3-backed [`ObjectStore`].

use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ObjectStore, StoreError, StoredObject};

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a store from the ambient AWS environment (region, credentials
    /// chain).
    pub async fn from_env() -> Self {
        let config = aws_config::from_env().load().await;
        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        debug!(bucket = %bucket, key = %key, "fetching object from S3");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let code = err.code().unwrap_or("InternalError").to_string();
                let message = err.message().unwrap_or_default().to_string();
                classify(code, message)
            })?;

        let content_type = output.content_type().map(str::to_string);
        let cache_control = output.cache_control().map(str::to_string);
        let last_modified = output.last_modified().and_then(|stamp| {
            DateTime::from_timestamp(stamp.secs(), stamp.subsec_nanos())
        });
        let expires = output
            .expires_string()
            .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc));

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::Other {
                code: "BodyReadError".to_string(),
                message: err.to_string(),
            })?
            .into_bytes();

        Ok(StoredObject {
            bytes,
            content_type,
            cache_control,
            last_modified,
            expires,
        })
    }
}

/// Buckets error codes into the classes the handler cares about. Anything
/// unrecognized is an upstream failure.
fn classify(code: String, message: String) -> StoreError {
    match code.as_str() {
        "NoSuchKey" | "NoSuchBucket" | "NoSuchVersion" => {
            StoreError::NotFound { code, message }
        }
        "AccessDenied"
        | "InvalidAccessKeyId"
        | "SignatureDoesNotMatch"
        | "AccountProblem"
        | "InvalidSecurity" => StoreError::AccessDenied { code, message },
        _ => StoreError::Other { code, message },
    }
}
