//! Resize policy enforcement.
//!
//! Setting `ALLOWED_SIZES` restricts requests to a fixed list of output
//! sizes. Under restriction a request
//! either names an allowed `WxH` size or, when `DEFAULT_TO_FIRST_SIZE` is
//! enabled, gets the first allowed size injected for it.

use serde_json::json;

use crate::config::Config;
use crate::error::HandlerError;

use super::EditMap;

/// Applies the configured size policy to the request edits, returning the
/// (possibly rewritten) edit map.
pub fn apply_policy(mut edits: EditMap, config: &Config) -> Result<EditMap, HandlerError> {
    if !config.sizes_restricted {
        normalize_zero_dimensions(&mut edits);
        return Ok(edits);
    }

    if config.allowed_sizes.is_empty() {
        return Err(HandlerError::NoSizesAllowed);
    }

    if resize_in_request(&edits) {
        let size = requested_size(&edits).ok_or(HandlerError::SizeNotAllowed)?;
        if !config.allowed_sizes.iter().any(|allowed| allowed == &size) {
            return Err(HandlerError::SizeNotAllowed);
        }
        normalize_zero_dimensions(&mut edits);
        return Ok(edits);
    }

    if config.default_to_first_size {
        let (width, height) =
            parse_size(&config.allowed_sizes[0]).ok_or(HandlerError::NoDefaultSize)?;
        edits.insert("resize".to_string(), json!({"width": width, "height": height}));
        normalize_zero_dimensions(&mut edits);
        Ok(edits)
    } else {
        Err(HandlerError::NoDefaultSize)
    }
}

/// True when the request carries a resize edit with at least one parameter.
fn resize_in_request(edits: &EditMap) -> bool {
    edits
        .get("resize")
        .and_then(|value| value.as_object())
        .map(|params| !params.is_empty())
        .unwrap_or(false)
}

fn requested_size(edits: &EditMap) -> Option<String> {
    let params = edits.get("resize")?.as_object()?;
    let width = params.get("width")?.as_u64()?;
    let height = params.get("height")?.as_u64()?;
    Some(format!("{}x{}", width, height))
}

/// A zero dimension means "derive this side from the aspect ratio". The
/// transform layer expects such dimensions to be absent, so drop them
/// here. Width is checked before height; only one is dropped.
fn normalize_zero_dimensions(edits: &mut EditMap) {
    let Some(params) = edits.get_mut("resize").and_then(|value| value.as_object_mut()) else {
        return;
    };
    let width_is_zero = params.get("width").and_then(|w| w.as_u64()) == Some(0);
    let height_is_zero = params.get("height").and_then(|h| h.as_u64()) == Some(0);
    if width_is_zero {
        params.remove("width");
    } else if height_is_zero {
        params.remove("height");
    }
}

fn parse_size(size: &str) -> Option<(u64, u64)> {
    let (width, height) = size.split_once('x')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}
