//! Output format negotiation.

/// Picks the output format for a response.
///
/// An explicit format named in the request wins. Otherwise, when automatic
/// WebP is enabled and the client advertises `image/webp` support, WebP is
/// chosen. `None` means "keep the source format".
pub fn negotiate(
    accept: Option<&str>,
    explicit: Option<&str>,
    auto_webp: bool,
) -> Option<String> {
    if let Some(format) = explicit {
        return Some(format.to_string());
    }
    if auto_webp && accept.map(|value| value.contains("image/webp")).unwrap_or(false) {
        return Some("webp".to_string());
    }
    None
}
