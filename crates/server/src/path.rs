//! Maps request paths onto files below the document root.
//!
//! Resolution is purely lexical: the request path is normalized first, so no
//! `..` segment survives to reach the filesystem, and the joined path is then
//! checked to still start with the document root. Only `/` separates segments;
//! a backslash, a NUL, or (on Windows) a drive colon inside a segment is rejected.

use std::path::PathBuf;

use mime::Mime;
use thiserror::Error;

use crate::mime::MimeMap;

/// Longest request path served, and longest filesystem path ever built.
pub const MAX_PATH_LEN: usize = 4096;

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("resolved path would exceed {max} bytes", max = MAX_PATH_LEN)]
    PathTooLong,

    #[error("path contains bytes that can't name a file")]
    InvalidPath,
}

/// A file below the document root and the media type to serve it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub mime: Mime,
}

/// Normalizes a request path.
///
/// The query string is dropped, `%XX` escapes are decoded, `.`, `..` and empty
/// segments are collapsed with `..` never climbing above `/`. The result always
/// starts with `/`, and ends with `/` when the input named a directory
/// (a trailing `/`, `/.` or `/..`).
///
/// Fails with [`ResolveError::InvalidPath`] when the decoded bytes are not
/// UTF-8 or contain a byte some filesystem treats as a separator or terminator.
pub fn normalize(raw: &str) -> Result<String, ResolveError> {
    let path = raw.split_once('?').map_or(raw, |(path, _query)| path);
    let decoded = percent_decode(path)?;
    if decoded.contains(is_forbidden) {
        return Err(ResolveError::InvalidPath);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let is_dir = matches!(decoded.rsplit('/').next(), Some("" | "." | ".."));

    let mut normalized = String::with_capacity(decoded.len() + 1);
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if is_dir || segments.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Resolves `raw_path` against `document_root`.
///
/// A path naming a directory gets `index.html` appended.
pub fn resolve(document_root: &str, raw_path: &str, mimes: &MimeMap) -> Result<ResolvedPath, ResolveError> {
    let normalized = normalize(raw_path)?;

    let root = document_root.trim_end_matches('/');
    let capacity = root.len() + normalized.len() + INDEX_FILE.len();
    if capacity > MAX_PATH_LEN {
        return Err(ResolveError::PathTooLong);
    }

    let mut joined = String::with_capacity(capacity);
    joined.push_str(root);
    joined.push_str(&normalized);
    if joined.ends_with('/') {
        joined.push_str(INDEX_FILE);
    }

    if !joined.starts_with(root) || !joined[root.len()..].starts_with('/') {
        return Err(ResolveError::InvalidPath);
    }

    let mime = mimes.lookup_path(&joined).clone();
    Ok(ResolvedPath { path: PathBuf::from(joined), mime })
}

/// Decodes `%XX` escapes; malformed escapes are kept as they are.
fn percent_decode(input: &str) -> Result<String, ResolveError> {
    if !input.contains('%') {
        return Ok(input.to_owned());
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (bytes.get(i + 1).and_then(hex_value), bytes.get(i + 2).and_then(hex_value))
        {
            decoded.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(decoded).map_err(|_e| ResolveError::InvalidPath)
}

fn is_forbidden(c: char) -> bool {
    c == '\0' || c == '\\' || (cfg!(windows) && c == ':')
}

fn hex_value(byte: &u8) -> Option<u8> {
    let byte = *byte;
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
