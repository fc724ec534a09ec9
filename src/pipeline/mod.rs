//! Edit pipeline.
//!
//! Decodes the original and applies the requested edits in order. The
//! `composite` edit is special-cased here since it fetches its overlay
//! from storage; every other edit dispatches by name into
//! [`crate::transform::ops`].

use serde_json::Value;
use tracing::debug;

use crate::error::HandlerError;
use crate::request::EditMap;
use crate::storage::ObjectStore;
use crate::transform::{ops, ImageHandle};

/// Decodes `bytes` and applies `edits` in request order.
pub async fn apply_edits(
    bytes: &[u8],
    edits: &EditMap,
    store: &dyn ObjectStore,
) -> Result<ImageHandle, HandlerError> {
    let mut handle = ImageHandle::decode(bytes)?;

    for (name, params) in edits {
        debug!(edit = %name, "applying edit");
        if name == "composite" {
            apply_composite(&mut handle, params, edits, store).await?;
        } else {
            ops::apply_operation(&mut handle, name, params)?;
        }
    }

    Ok(handle)
}

/// Fetches the overlay named by the edit parameters, sizes it to the
/// output dimensions and draws it over the image.
async fn apply_composite(
    handle: &mut ImageHandle,
    params: &Value,
    edits: &EditMap,
    store: &dyn ObjectStore,
) -> Result<(), HandlerError> {
    let object = params
        .as_object()
        .ok_or_else(|| HandlerError::invalid_edit("composite", "composite expects an object"))?;
    let bucket = object
        .get("bucket")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::invalid_edit("composite", "overlay bucket is required"))?;
    let key = object
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::invalid_edit("composite", "overlay key is required"))?;

    let overlay_object = store
        .get(bucket, key)
        .await
        .map_err(|err| HandlerError::OverlayFetch {
            code: err.code().to_string(),
            message: err.message().to_string(),
        })?;

    let mut overlay = ImageHandle::decode(&overlay_object.bytes)?;

    // Size the overlay to the final output: the primary dimensions, unless
    // a resize edit (including one injected by the size policy) says
    // otherwise.
    let (mut width, mut height) = (Some(handle.width()), Some(handle.height()));
    if let Some(resize) = edits.get("resize").and_then(Value::as_object) {
        width = resize
            .get("width")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        height = resize
            .get("height")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
    }
    overlay.resize(width, height);

    handle.composite(&overlay.image);
    Ok(())
}
