//! Object storage access.
//!
//! The handler reads originals and overlays through the [`ObjectStore`]
//! trait so that tests can substitute an in-memory store for S3.

pub mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// An object fetched from storage, with the response metadata the handler
/// forwards to clients.
#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

/// Storage failure, classified so the handler can map it to a response.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound { code: String, message: String },
    AccessDenied { code: String, message: String },
    Other { code: String, message: String },
}

impl StoreError {
    pub fn code(&self) -> &str {
        match self {
            StoreError::NotFound { code, .. }
            | StoreError::AccessDenied { code, .. }
            | StoreError::Other { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StoreError::NotFound { message, .. }
            | StoreError::AccessDenied { message, .. }
            | StoreError::Other { message, .. } => message,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { code, message } => {
                write!(f, "object not found ({}): {}", code, message)
            }
            StoreError::AccessDenied { code, message } => {
                write!(f, "access denied ({}): {}", code, message)
            }
            StoreError::Other { code, message } => {
                write!(f, "storage error ({}): {}", code, message)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Read access to an object store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError>;
}
