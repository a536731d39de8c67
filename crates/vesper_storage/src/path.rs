//! Collision-free object paths.

use uuid::Uuid;

/// File extension for an image MIME type.
///
/// Unknown types fall back to `bin`.
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Fresh path `{owner}/{uuid}.{ext}` for an upload.
///
/// Every call returns a new path, even for the same owner and type.
///
/// # Examples
///
/// ```
/// use vesper_storage::object_path;
///
/// let a = object_path("author-1", "image/png");
/// let b = object_path("author-1", "image/png");
/// assert!(a.starts_with("author-1/") && a.ends_with(".png"));
/// assert_ne!(a, b);
/// ```
pub fn object_path(owner: &str, content_type: &str) -> String {
    format!(
        "{}/{}.{}",
        owner.trim_matches('/'),
        Uuid::new_v4(),
        extension_for(content_type)
    )
}
