//! Helpers for slash-separated paths inside the mounted tree.

/// Names starting with this are reserved (hidden) and cannot be created.
const HIDDEN_PREFIX: char = '.';

/// Non-empty segments of `path`. `/` has none.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Last segment of `path`.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Parent of an absolute path: `/a/b` -> `/a`, `/a` -> `/`.
/// Relative paths and `/` itself have no parent.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&trimmed[..i]),
        None => None,
    }
}

pub fn is_hidden(path: &str) -> bool {
    file_name(path).starts_with(HIDDEN_PREFIX)
}

/// Text after the last dot of a name, if any: `a.tar.gz` -> `gz`.
pub fn file_extension(name: &str) -> Option<&str> {
    name.rfind('.').map(|i| &name[i + 1..])
}

/// Name without its last extension: `a.tar.gz` -> `a.tar`.
pub fn without_file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// Number a name to resolve a conflict: `a.txt` -> `a.1.txt`, `a` -> `a.1`.
pub fn numbered_file_name(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(i) => format!("{}.{}{}", &name[..i], n, &name[i..]),
        None => format!("{}.{}", name, n),
    }
}
