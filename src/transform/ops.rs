//! The by-name edit operations.
//!
//! Edits from the request are dispatched here in request order. The
//! `composite` edit never reaches this module; it needs storage access and
//! is handled by the pipeline directly.

use serde_json::Value;

use crate::error::HandlerError;

use super::ImageHandle;

/// Applies a single named edit to the image.
pub fn apply_operation(
    handle: &mut ImageHandle,
    name: &str,
    params: &Value,
) -> Result<(), HandlerError> {
    // A `false` parameter disables the edit
    if params == &Value::Bool(false) {
        return Ok(());
    }

    match name {
        "resize" => {
            let object = params
                .as_object()
                .ok_or_else(|| HandlerError::invalid_edit(name, "resize expects an object"))?;
            let width = dimension(object.get("width"))?;
            let height = dimension(object.get("height"))?;
            handle.resize(width, height);
        }
        "grayscale" | "greyscale" => {
            handle.image = handle.image.grayscale();
        }
        "flip" => {
            handle.image = handle.image.flipv();
        }
        "flop" => {
            handle.image = handle.image.fliph();
        }
        "rotate" => {
            let degrees = params
                .as_u64()
                .ok_or_else(|| HandlerError::invalid_edit(name, "rotate expects a number"))?;
            handle.image = match degrees {
                0 => return Ok(()),
                90 => handle.image.rotate90(),
                180 => handle.image.rotate180(),
                270 => handle.image.rotate270(),
                _ => {
                    return Err(HandlerError::invalid_edit(
                        name,
                        "rotation must be a multiple of 90 degrees",
                    ))
                }
            };
        }
        "blur" => {
            let sigma = params
                .as_f64()
                .ok_or_else(|| HandlerError::invalid_edit(name, "blur expects a number"))?;
            handle.image = handle.image.blur(sigma as f32);
        }
        "negate" => {
            handle.image.invert();
        }
        other => {
            return Err(HandlerError::UnsupportedOperation {
                name: other.to_string(),
            })
        }
    }

    Ok(())
}

fn dimension(value: Option<&Value>) -> Result<Option<u32>, HandlerError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => {
            let parsed = raw
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    HandlerError::invalid_edit("resize", "dimensions must be whole numbers")
                })?;
            Ok(Some(parsed))
        }
    }
}
