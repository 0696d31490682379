//! Helpers for slash-separated data paths.
//!
//! Paths are normalized to have no leading or trailing slash; the root is
//! the empty string.

/// Characters that may not appear in a data key.
pub const INVALID_KEY_CHARS: &[char] = &['.', '$', '#', '[', ']', '/'];

/// Strip leading and trailing slashes.
#[must_use]
pub fn trim(path: &str) -> &str {
    path.trim_matches('/')
}

/// Split a path into its non-empty segments.
#[must_use]
pub fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Normalize a path: collapse repeated slashes and drop the outer ones.
#[must_use]
pub fn normalize(path: &str) -> String {
    split(path).join("/")
}

/// Join a base path with a relative one.
#[must_use]
pub fn join(base: &str, relative: &str) -> String {
    let base = trim(base);
    let relative = normalize(relative);
    match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative,
        (false, true) => normalize(base),
        (false, false) => format!("{}/{relative}", normalize(base)),
    }
}

/// The parent of a path, or `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<String> {
    let mut segments = split(path);
    segments.pop()?;
    Some(segments.join("/"))
}

/// The last segment of a path, or `None` for the root.
#[must_use]
pub fn basename(path: &str) -> Option<&str> {
    split(path).pop()
}

/// Whether `ancestor` is a strict ancestor of `path`.
#[must_use]
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    let a = split(ancestor);
    let p = split(path);
    a.len() < p.len() && a.iter().zip(&p).all(|(x, y)| x == y)
}

/// Whether `key` can be used as a data key.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(INVALID_KEY_CHARS) && !key.chars().any(char::is_control)
}

/// Whether every segment of `path` is a valid data key.
#[must_use]
pub fn is_valid_path(path: &str) -> bool {
    split(path).iter().all(|s| is_valid_key(s))
}
