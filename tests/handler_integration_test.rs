// End-to-end handler tests against an in-memory object store.

use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use md5::{Digest, Md5};
use serde_json::json;

use utsushi::config::MemorySource;
use utsushi::handler::handle;
use utsushi::storage::{ObjectStore, StoreError, StoredObject};

#[derive(Default)]
struct MemoryStore {
    objects: HashMap<(String, String), StoredObject>,
}

impl MemoryStore {
    fn with_object(mut self, bucket: &str, key: &str, object: StoredObject) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), object);
        self
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                code: "NoSuchKey".to_string(),
                message: "The specified key does not exist.".to_string(),
            })
    }
}

fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn stored(bytes: Vec<u8>) -> StoredObject {
    StoredObject {
        bytes: Bytes::from(bytes),
        ..Default::default()
    }
}

fn request_path(payload: &serde_json::Value) -> String {
    format!("/{}", BASE64.encode(payload.to_string()))
}

fn no_query() -> HashMap<String, Vec<String>> {
    HashMap::new()
}

fn no_headers() -> HashMap<String, String> {
    HashMap::new()
}

fn decode_body(body: &str) -> DynamicImage {
    let bytes = BASE64.decode(body).unwrap();
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .unwrap()
        .decode()
        .unwrap()
}

#[tokio::test]
async fn test_edit_request_succeeds() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(10, 20, [9, 9, 9, 255])));
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos");

    let path = request_path(&json!({
        "bucket": "photos",
        "key": "cat.png",
        "edits": {"grayscale": true, "flip": true}
    }));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 200);
    assert!(response.is_base64_encoded);
    assert_eq!(response.headers.get("Content-Type").unwrap(), "image/png");
    assert_eq!(
        response.headers.get("Access-Control-Allow-Methods").unwrap(),
        "GET"
    );
    let image = decode_body(&response.body);
    assert_eq!((image.width(), image.height()), (10, 20));
}

#[tokio::test]
async fn test_metadata_headers_forwarded() {
    let object = StoredObject {
        bytes: Bytes::from(png_bytes(4, 4, [1, 1, 1, 255])),
        cache_control: Some("max-age=3600".to_string()),
        last_modified: Utc.with_ymd_and_hms(2023, 7, 14, 9, 5, 2).single(),
        ..Default::default()
    };
    let store = MemoryStore::default().with_object("photos", "cat.png", object);
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos");

    let path = request_path(&json!({"key": "cat.png"}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers.get("Cache-Control").unwrap(), "max-age=3600");
    assert_eq!(
        response.headers.get("Last-Modified").unwrap(),
        "Fri, 14 Jul 2023 09:05:02 GMT"
    );
    assert!(!response.headers.contains_key("Expires"));
}

#[tokio::test]
async fn test_auto_webp_negotiation() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(4, 4, [1, 1, 1, 255])));
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("AUTO_WEBP", "Yes");

    let path = request_path(&json!({"key": "cat.png"}));
    let mut headers = HashMap::new();
    headers.insert("Accept".to_string(), "image/webp,image/*".to_string());
    let response = handle(Some(&path), &no_query(), &headers, &store, &config).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers.get("Content-Type").unwrap(), "image/webp");
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let store = MemoryStore::default();
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos");

    let path = request_path(&json!({"key": "gone.png"}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 404);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["status"], 404);
    assert_eq!(body["code"], "NoSuchKey");
}

#[tokio::test]
async fn test_bucket_not_in_allow_list() {
    let store =
        MemoryStore::default().with_object("private", "cat.png", stored(png_bytes(4, 4, [1, 1, 1, 255])));
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos,assets");

    let path = request_path(&json!({"bucket": "private", "key": "cat.png"}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 403);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["code"], "ImageBucket::CannotAccessBucket");
}

#[tokio::test]
async fn test_restricted_size_rejected() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(10, 10, [1, 1, 1, 255])));
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("ALLOWED_SIZES", "300x300");

    let path = request_path(&json!({
        "key": "cat.png",
        "edits": {"resize": {"width": 400, "height": 400}}
    }));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 400);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["code"], "Resize::SizeNotAllowed");
}

#[tokio::test]
async fn test_restricted_size_default_applied() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(100, 100, [1, 1, 1, 255])));
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("ALLOWED_SIZES", "30x20")
        .set("DEFAULT_TO_FIRST_SIZE", "Yes");

    let path = request_path(&json!({"key": "cat.png"}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 200);
    let image = decode_body(&response.body);
    assert_eq!((image.width(), image.height()), (30, 20));
}

#[tokio::test]
async fn test_favicon_is_not_found() {
    let store = MemoryStore::default();
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos");

    let response = handle(
        Some("/favicon.ico"),
        &no_query(),
        &no_headers(),
        &store,
        &config,
    )
    .await;

    assert_eq!(response.status_code, 404);
}

#[tokio::test]
async fn test_signed_request_accepted() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(4, 4, [1, 1, 1, 255])));
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("SECURITY_KEY", "s3cret");

    let edits = json!({"grayscale": true});
    let mut hasher = Md5::new();
    hasher.update(format!("s3cretcat.png{}", edits));
    let hash = hex::encode(hasher.finalize());

    let path = request_path(&json!({"key": "cat.png", "edits": edits, "hash": hash}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_unsigned_request_rejected() {
    let store = MemoryStore::default();
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("SECURITY_KEY", "s3cret");

    let path = request_path(&json!({"key": "cat.png"}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 403);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["code"], "Request::NoSecurityHash");
}

#[tokio::test]
async fn test_tampered_signature_rejected() {
    let store = MemoryStore::default();
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("SECURITY_KEY", "s3cret");

    let path = request_path(&json!({
        "key": "cat.png",
        "edits": {"grayscale": true},
        "hash": "0000deadbeef0000deadbeef0000dead"
    }));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 403);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["code"], "Request::HashException");
}

#[tokio::test]
async fn test_composite_overlay_applied() {
    let store = MemoryStore::default()
        .with_object("photos", "base.png", stored(png_bytes(8, 8, [0, 0, 255, 255])))
        .with_object("overlays", "logo.png", stored(png_bytes(2, 2, [255, 0, 0, 255])));
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos");

    let path = request_path(&json!({
        "key": "base.png",
        "edits": {"composite": {"bucket": "overlays", "key": "logo.png"}}
    }));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 200);
    let image = decode_body(&response.body).to_rgba8();
    assert_eq!(image.get_pixel(7, 7).0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn test_cors_origin_header() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(4, 4, [1, 1, 1, 255])));
    let config = MemorySource::new()
        .set("SOURCE_BUCKETS", "photos")
        .set("CORS_ENABLED", "Yes")
        .set("CORS_ORIGIN", "https://example.com");

    let path = request_path(&json!({"key": "cat.png"}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(
        response.headers.get("Access-Control-Allow-Origin").unwrap(),
        "https://example.com"
    );
}

#[tokio::test]
async fn test_unknown_edit_rejected() {
    let store =
        MemoryStore::default().with_object("photos", "cat.png", stored(png_bytes(4, 4, [1, 1, 1, 255])));
    let config = MemorySource::new().set("SOURCE_BUCKETS", "photos");

    let path = request_path(&json!({"key": "cat.png", "edits": {"sharpen": true}}));
    let response = handle(Some(&path), &no_query(), &no_headers(), &store, &config).await;

    assert_eq!(response.status_code, 400);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["code"], "Edits::UnsupportedOperation");
}
