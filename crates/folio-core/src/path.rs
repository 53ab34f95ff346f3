//! Path and URL helpers.
//!
//! All functions work on `/`-separated relative path strings as produced by
//! the document repository, not on platform paths.

/// Extension of the last path segment, without the dot.
///
/// Dotfiles such as `.draft` have no extension.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) => Some(&name[pos + 1..]),
    }
}

/// The path with the extension of its last segment removed.
pub fn remove_extension(path: &str) -> &str {
    match extension(path) {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    }
}

/// Replace (or append) the extension of the last path segment.
pub fn replace_extension(path: &str, ext: &str) -> String {
    format!("{}.{}", remove_extension(path), ext.trim_start_matches('.'))
}

/// Collapse runs of `/` into a single separator.
pub fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

/// Derive the canonical site URL for a source file.
///
/// `posts/foo.md` maps to `/posts/foo`, `posts/foo/index.md` to
/// `/posts/foo` and `index.md` to `/`.
pub fn filepath_to_url(filepath: &str) -> String {
    let normalized = filepath.replace('\\', "/");
    let url = collapse_slashes(&format!("/{}", remove_extension(&normalized)));
    let url = if url == "/index" {
        ""
    } else {
        url.strip_suffix("/index").unwrap_or(&url)
    };
    let url = url.trim_end_matches('/');

    if url.is_empty() {
        "/".to_string()
    } else {
        url.to_string()
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
