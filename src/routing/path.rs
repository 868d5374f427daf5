//! Route path normalization.

/// Normalize a registration path: one leading slash, no trailing slash,
/// no empty segments. The empty path becomes `/`.
pub fn normalize(path: &str) -> String {
    join(path, "")
}

/// Join a mount prefix and a child path into a normalized route path.
pub fn join(prefix: &str, child: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(child.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect();

    format!("/{}", segments.join("/"))
}
