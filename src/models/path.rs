//! Slash-delimited store paths.
//!
//! A path with an even number of segments addresses a single document
//! (`users/alice`), an odd number addresses a collection (`users`,
//! `users/alice/orders`). Classification is purely structural.

/// Path separator used by the store.
pub const SEPARATOR: char = '/';

/// Returns `true` if `path` has an even number of segments.
///
/// Empty-string handling is left to callers' own path validation: `""` is a
/// single (empty) segment and therefore classifies as a collection path.
///
/// # Examples
///
/// ```rust
/// use firebulk::models::path::is_document_path;
///
/// assert!(is_document_path("users/alice"));
/// assert!(!is_document_path("users"));
/// ```
#[must_use]
pub fn is_document_path(path: &str) -> bool {
    segment_count(path) % 2 == 0
}

/// Returns `true` if `path` has an odd number of segments.
#[must_use]
pub fn is_collection_path(path: &str) -> bool {
    !is_document_path(path)
}

/// Number of `/`-separated segments in `path`.
#[must_use]
pub fn segment_count(path: &str) -> usize {
    path.split(SEPARATOR).count()
}

/// Returns the last segment of `path` (the document ID or collection name).
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Returns everything before the last segment, or `None` for a root segment.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    path.rsplit_once(SEPARATOR).map(|(parent, _)| parent)
}

/// Joins a parent path and a child segment.
#[must_use]
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}{SEPARATOR}{child}")
    }
}

/// Checks that every segment is usable as a store key.
///
/// Rejects empty segments (leading, trailing or doubled slashes) and segments
/// that are `.`/`..` or start with a dot.
///
/// # Errors
///
/// Returns a human-readable reason when the path is malformed.
pub fn validate_segments(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path is empty".to_string());
    }
    for (index, segment) in path.split(SEPARATOR).enumerate() {
        if segment.is_empty() {
            return Err(format!("segment {index} is empty"));
        }
        if segment.starts_with('.') {
            return Err(format!("segment '{segment}' must not start with '.'"));
        }
        if segment.contains('\\') || segment.contains('\0') {
            return Err(format!("segment '{segment}' contains a forbidden character"));
        }
    }
    Ok(())
}
