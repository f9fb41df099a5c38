//! URI helpers: relativizing links between generated pages.

use std::path::Path;

use url::Url;

use crate::error::Error;

/// The shortest reference which, resolved against `base`, yields `target`.
///
/// Falls back to the absolute target when the two differ in scheme, host or
/// port. When both name the same directory the result is `./`.
pub fn relativize(base: &Url, target: &Url) -> String {
    if base.cannot_be_a_base() || target.cannot_be_a_base() {
        return target.to_string();
    }
    if base.scheme() != target.scheme()
        || base.host_str() != target.host_str()
        || base.port_or_known_default() != target.port_or_known_default()
        || base.username() != target.username()
    {
        return target.to_string();
    }

    // Directory segments of the base; the last segment is its file name.
    let base_path = base.path();
    let base_dir = base_path.rsplit_once('/').map_or("", |(dir, _)| return dir);
    let base_segments: Vec<&str> = split_segments(base_dir);

    let target_path = target.path();
    let (target_dir, target_file) = target_path.rsplit_once('/').unwrap_or(("", target_path));
    let target_segments: Vec<&str> = split_segments(target_dir);

    let common = base_segments
        .iter()
        .zip(&target_segments)
        .take_while(|(a, b)| return a == b)
        .count();

    let mut out = String::new();
    for _ in common..base_segments.len() {
        out.push_str("../");
    }
    for segment in target_segments.iter().skip(common) {
        out.push_str(segment);
        out.push('/');
    }
    out.push_str(target_file);

    // Same document: keep the query or fragment alone when possible.
    if out == base_path.rsplit('/').next().unwrap_or_default() && target.query() == base.query() {
        if let Some(fragment) = target.fragment() {
            return format!("#{fragment}");
        }
    }
    if out.is_empty() {
        out.push_str("./");
    }
    if let Some(query) = target.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = target.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    return out;
}

/// Non-empty path segments of an already-split directory path.
fn split_segments(dir: &str) -> Vec<&str> {
    return dir.split('/').filter(|s| return !s.is_empty()).collect();
}

/// Append a trailing `/` so the URL resolves children as a directory.
pub fn assume_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    return url;
}

/// Interpret `text` as a filesystem path (when it starts with `/` or `.`)
/// or otherwise as a URI.
///
/// # Errors
///
/// Returns `Error::InvalidBase` when the text is neither an absolute-able
/// path nor a parseable URI, or `Error::Io` if the working directory is
/// unavailable.
pub fn file_or_uri(text: &str) -> Result<Url, Error> {
    let invalid = || return Error::InvalidBase { text: text.to_string() };
    if text.starts_with('/') || text.starts_with('.') {
        let path = Path::new(text);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        return Url::from_file_path(&absolute).map_err(|()| return invalid());
    }
    return Url::parse(text).map_err(|_| return invalid());
}
