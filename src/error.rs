// Error types module

use std::fmt;

/// Centralized error type for the image handler pipeline.
///
/// Every failure the pipeline can produce carries the `{status, code,
/// message}` triple that the HTTP-style response exposes verbatim. The
/// codes are part of the public interface (clients and operators match
/// on them), so they are fixed strings rather than derived names.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerError {
    // === Request decoding ===
    /// The path shape matched neither the base64 nor the JSON scheme.
    RequestType,
    /// The path matched a scheme but could not be decoded/parsed.
    Decode,
    /// No path was present on the request.
    MissingPath,
    /// The decoded payload parsed but carries no `key` field.
    MissingKey,

    // === Routing / policy ===
    /// Favicon request, or the object was absent from storage.
    NotFound { code: String, message: String },
    /// A bucket was requested that is not in the configured whitelist.
    BucketNotAllowed,
    /// SOURCE_BUCKETS is unset or empty.
    NoSourceBuckets,
    /// The requested resize is not in the ALLOWED_SIZES set.
    SizeNotAllowed,
    /// Sizes are restricted, no resize was requested, and defaulting is off.
    NoDefaultSize,
    /// Sizes are restricted but the ALLOWED_SIZES list parses to nothing.
    NoSizesAllowed,

    // === Request signing ===
    /// SECURITY_KEY is set but the request carried no hash.
    MissingHash,
    /// The supplied hash does not match the computed digest.
    HashMismatch,

    // === Upstream storage ===
    /// The original image could not be fetched (non-404 storage failure).
    OriginalFetch { code: String, message: String },
    /// The overlay image for a composite edit could not be fetched.
    OverlayFetch { code: String, message: String },

    // === Edit application ===
    /// The edit map names an operation the transform engine does not know.
    UnsupportedOperation { name: String },
    /// An edit operation was given parameters it cannot interpret.
    InvalidEditParams { name: String, message: String },
    /// Decoding, transforming, or re-encoding the image failed.
    TransformFailed { message: String },
}

impl HandlerError {
    /// HTTP status code associated with this failure.
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::RequestType
            | HandlerError::Decode
            | HandlerError::MissingPath
            | HandlerError::MissingKey
            | HandlerError::NoSourceBuckets
            | HandlerError::SizeNotAllowed
            | HandlerError::NoDefaultSize
            | HandlerError::NoSizesAllowed
            | HandlerError::UnsupportedOperation { .. }
            | HandlerError::InvalidEditParams { .. } => 400,

            HandlerError::BucketNotAllowed
            | HandlerError::MissingHash
            | HandlerError::HashMismatch => 403,

            HandlerError::NotFound { .. } => 404,

            HandlerError::OverlayFetch { .. } | HandlerError::TransformFailed { .. } => 500,

            HandlerError::OriginalFetch { .. } => 502,
        }
    }

    /// Stable error code surfaced in the response body.
    ///
    /// Storage failures forward the provider's own error code so operators
    /// can tell a bad deployment from a bad client request in logs.
    pub fn code(&self) -> String {
        match self {
            HandlerError::RequestType => "Request::RequestTypeError".to_string(),
            HandlerError::Decode => "DecodeRequest::CannotDecodeRequest".to_string(),
            HandlerError::MissingPath => "DecodeRequest::CannotReadPath".to_string(),
            HandlerError::MissingKey => "DecodeRequest::MissingKey".to_string(),
            HandlerError::NotFound { code, .. } => code.clone(),
            HandlerError::BucketNotAllowed => "ImageBucket::CannotAccessBucket".to_string(),
            HandlerError::NoSourceBuckets => "Request::NoSourceBuckets".to_string(),
            HandlerError::SizeNotAllowed => "Resize::SizeNotAllowed".to_string(),
            HandlerError::NoDefaultSize => "Resize::NoDefault".to_string(),
            HandlerError::NoSizesAllowed => "Resize::NoSizesAllowed".to_string(),
            HandlerError::MissingHash => "Request::NoSecurityHash".to_string(),
            HandlerError::HashMismatch => "Request::HashException".to_string(),
            HandlerError::OriginalFetch { code, .. } => code.clone(),
            HandlerError::OverlayFetch { code, .. } => code.clone(),
            HandlerError::UnsupportedOperation { .. } => "Edits::UnsupportedOperation".to_string(),
            HandlerError::InvalidEditParams { .. } => "Edits::InvalidParameters".to_string(),
            HandlerError::TransformFailed { .. } => "Transform::OperationFailed".to_string(),
        }
    }

    /// Human-readable message surfaced in the response body.
    pub fn message(&self) -> String {
        match self {
            HandlerError::RequestType => {
                "The type of request you are making could not be processed. Please ensure that \
                 your original image is of a supported file type (jpg, png, tiff, webp) and that \
                 your image request is provided in the correct syntax. Refer to the documentation \
                 for additional guidance on forming image requests."
                    .to_string()
            }
            HandlerError::Decode => {
                "The image request you provided could not be decoded. Please check that your \
                 request is base64 encoded properly and refer to the documentation for \
                 additional guidance."
                    .to_string()
            }
            HandlerError::MissingPath => {
                "The URL path you provided could not be read. Please ensure that it is properly \
                 formed according to the solution documentation."
                    .to_string()
            }
            HandlerError::MissingKey => {
                "The image request you provided does not contain a key. Please specify the \
                 object key of the image to process."
                    .to_string()
            }
            HandlerError::NotFound { message, .. } => message.clone(),
            HandlerError::BucketNotAllowed => {
                "The bucket you specified could not be accessed. Please check that the bucket is \
                 specified in your SOURCE_BUCKETS."
                    .to_string()
            }
            HandlerError::NoSourceBuckets => {
                "The SOURCE_BUCKETS variable could not be read. Please check that it is not empty \
                 and contains at least one source bucket, or multiple buckets separated by \
                 commas. Spaces can be provided between commas and bucket names, these will be \
                 automatically parsed out when decoding."
                    .to_string()
            }
            HandlerError::SizeNotAllowed => {
                "The size you specified is not allowed. Please check the sizes specified in \
                 ALLOWED_SIZES."
                    .to_string()
            }
            HandlerError::NoDefaultSize => {
                "No resize was specified and no default size is defined.".to_string()
            }
            HandlerError::NoSizesAllowed => "The ALLOWED_SIZES list is empty.".to_string(),
            HandlerError::MissingHash => {
                "The SECURITY_KEY variable is set but no hash was provided.".to_string()
            }
            HandlerError::HashMismatch => "Invalid hash.".to_string(),
            HandlerError::OriginalFetch { message, .. } => message.clone(),
            HandlerError::OverlayFetch { message, .. } => message.clone(),
            HandlerError::UnsupportedOperation { name } => {
                format!("The edit operation '{}' is not supported.", name)
            }
            HandlerError::InvalidEditParams { name, message } => {
                format!("Invalid parameters for edit '{}': {}", name, message)
            }
            HandlerError::TransformFailed { message } => message.clone(),
        }
    }

    /// JSON body for the error response: `{"status", "code", "message"}`.
    pub fn to_body(&self) -> String {
        serde_json::json!({
            "status": self.status(),
            "code": self.code(),
            "message": self.message(),
        })
        .to_string()
    }

    pub fn transform_failed(message: impl Into<String>) -> Self {
        HandlerError::TransformFailed {
            message: message.into(),
        }
    }

    pub fn invalid_edit(name: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::InvalidEditParams {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for HandlerError {}
