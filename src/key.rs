//! Lexical key normalization.
//!
//! Keys are treated as slash-separated paths and reduced to a canonical
//! form before any map lookup, so `/a//b/./../b` and `/a/b` address the
//! same entry.

/// Collapses repeated separators and `.`/`..` segments.
///
/// Rules, applied purely lexically:
/// - repeated slashes collapse to one
/// - `.` segments are dropped
/// - `..` segments remove the preceding segment; at the root of an
///   absolute path they are dropped, at the start of a relative path
///   they are kept
/// - a trailing slash is removed
/// - the empty result is `"."` for relative keys and `"/"` for absolute
pub(crate) fn normalize(key: &str) -> String {
    let rooted = key.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in key.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    if rooted {
        format!("/{}", body)
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}
