//! Source bucket authorization.

use crate::error::HandlerError;

/// Resolves the bucket a request may read from.
///
/// A request naming a bucket must name one from the allow list; a request
/// naming none falls back to the first configured bucket.
pub fn resolve(requested: Option<&str>, buckets: &[String]) -> Result<String, HandlerError> {
    if buckets.is_empty() {
        return Err(HandlerError::NoSourceBuckets);
    }

    match requested {
        Some(bucket) => {
            if buckets.iter().any(|allowed| allowed == bucket) {
                Ok(bucket.to_string())
            } else {
                Err(HandlerError::BucketNotAllowed)
            }
        }
        None => Ok(buckets[0].clone()),
    }
}
