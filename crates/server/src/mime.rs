//! File extension to media type table.

use mime::Mime;
use std::collections::HashMap;

/// Maps lower-cased file extensions to media types.
///
/// Filled once at startup and read-only afterwards; unknown extensions map to
/// `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct MimeMap {
    types: HashMap<String, Mime>,
    fallback: Mime,
}

impl MimeMap {
    /// A map without any registered extension.
    pub fn empty() -> Self {
        Self { types: HashMap::new(), fallback: mime::APPLICATION_OCTET_STREAM }
    }

    /// Registers (or replaces) the media type of `ext`.
    pub fn define(&mut self, ext: &str, mime: Mime) {
        self.types.insert(ext.trim_start_matches('.').to_ascii_lowercase(), mime);
    }

    pub fn lookup(&self, ext: &str) -> &Mime {
        let found = if ext.bytes().any(|b| b.is_ascii_uppercase()) {
            self.types.get(&ext.to_ascii_lowercase())
        } else {
            self.types.get(ext)
        };
        found.unwrap_or(&self.fallback)
    }

    /// Media type for the extension of the last path segment.
    pub fn lookup_path(&self, path: &str) -> &Mime {
        self.lookup(extension(path))
    }
}

impl Default for MimeMap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.define("html", mime::TEXT_HTML);
        map.define("htm", mime::TEXT_HTML);
        map.define("css", mime::TEXT_CSS);
        map.define("js", mime::TEXT_JAVASCRIPT);
        map.define("txt", mime::TEXT_PLAIN);
        map.define("json", mime::APPLICATION_JSON);
        map.define("png", mime::IMAGE_PNG);
        map.define("jpg", mime::IMAGE_JPEG);
        map.define("jpeg", mime::IMAGE_JPEG);
        map.define("gif", mime::IMAGE_GIF);
        map.define("svg", mime::IMAGE_SVG);
        map.define("pdf", mime::APPLICATION_PDF);
        map
    }
}

/// The text after the last `.` of the last segment, empty when there is none.
fn extension(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rfind('.') {
        Some(0) | None => "",
        Some(dot) => &file_name[dot + 1..],
    }
}
