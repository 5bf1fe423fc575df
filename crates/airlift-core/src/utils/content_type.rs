//! Content-type inference for manifest assets and local serving.
//!
//! The Expo client only needs the handful of types a Metro export can
//! contain; anything unknown is served as an opaque octet stream.

/// Content type for a file extension, with or without the leading dot.
#[must_use]
pub fn content_type_for_ext(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "json" => "application/json",
        "js" | "hbc" | "bundle" => "application/javascript",
        _ => "application/octet-stream",
    }
}

/// Content type inferred from a path's extension.
#[must_use]
pub fn content_type_for_path(path: &str) -> &'static str {
    match path.rsplit_once('.') {
        Some((_, ext)) => content_type_for_ext(ext),
        None => "application/octet-stream",
    }
}

/// Whether the extension maps to an image type (drives the object-store
/// resource-type split).
#[must_use]
pub fn is_image_ext(ext: &str) -> bool {
    content_type_for_ext(ext).starts_with("image/")
}
