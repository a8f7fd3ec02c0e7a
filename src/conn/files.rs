//! Path resolution for file responses.

use std::path::{Component, Path, PathBuf};

/// Resolve `requested` to the path that will be opened, or `None` if it
/// must not be served.
///
/// Relative paths are taken relative to `public_dir`. Paths ending in `.` or
/// `/` are always refused. With `safe` set, the lexically normalized path
/// must lie strictly inside `public_dir`.
pub fn resolve_file(public_dir: &Path, requested: &Path, safe: bool) -> Option<PathBuf> {
    let raw = requested.to_string_lossy();
    if raw.is_empty() || raw.ends_with('.') || raw.ends_with('/') {
        return None;
    }

    let resolved = normalize(&public_dir.join(requested));

    if safe {
        let root = normalize(public_dir);
        if resolved == root || !resolved.starts_with(&root) {
            return None;
        }
    }

    Some(resolved)
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Content type for a file, by extension.
pub fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("css") => "text/css",
        Some("html") | Some("htm") => "text/html",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}
