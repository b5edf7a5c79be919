//! Pure helpers over slash-delimited object-store paths.
//!
//! Every path handed out by this module is absolute and normalized: it starts
//! with `/`, contains no empty segments and has no trailing slash unless it is
//! the root itself. Malformed input (including the empty string) never fails;
//! it collapses towards the root.

/// The root path.
pub const ROOT: &str = "/";

/// Normalize a path into its canonical absolute form.
///
/// `""` becomes `/`, repeated slashes collapse and a trailing slash is
/// dropped. A missing leading slash is added.
pub fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return ROOT.to_string();
    }
    format!("/{}", parts.join("/"))
}

/// Split a path into its segments. The root has none.
pub fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parent of a path. The root is its own parent.
pub fn parent(path: &str) -> String {
    let mut parts = segments(path);
    parts.pop();
    if parts.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Append a segment to a base path.
///
/// The segment may itself contain slashes; the result is normalized.
pub fn join(base: &str, segment: &str) -> String {
    normalize(&format!("{base}/{segment}"))
}

/// Whether the path is the root.
pub fn is_root(path: &str) -> bool {
    normalize(path) == ROOT
}

/// Last segment of a path, or `None` for the root.
pub fn file_name(path: &str) -> Option<String> {
    segments(path).pop()
}
