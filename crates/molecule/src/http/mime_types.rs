use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const HTML: &str = "text/html";
pub const TEXT: &str = "text/plain";
pub const CSS: &str = "text/css";
pub const JAVASCRIPT: &str = "application/javascript";
pub const JSON: &str = "application/json";
pub const PNG: &str = "image/png";
pub const GIF: &str = "image/gif";
pub const JPEG: &str = "image/jpeg";
pub const ICON: &str = "image/x-icon";
pub const SVG: &str = "image/svg+xml";
pub const BINARY_DATA: &str = "application/octet-stream";

static DEFAULTS: Lazy<MimeTypes> = Lazy::new(|| {
    let mut mime_types = MimeTypes::new();
    mime_types.register("txt", TEXT);
    mime_types.register("html", HTML);
    mime_types.register("htm", HTML);
    mime_types.register("css", CSS);
    mime_types.register("js", JAVASCRIPT);
    mime_types.register("json", JSON);
    mime_types.register("png", PNG);
    mime_types.register("gif", GIF);
    mime_types.register("jpg", JPEG);
    mime_types.register("jpeg", JPEG);
    mime_types.register("ico", ICON);
    mime_types.register("svg", SVG);
    mime_types
});

/// Maps file extensions to media types.
#[derive(Debug, Clone, Default)]
pub struct MimeTypes {
    known_types: HashMap<String, String>,
}

impl MimeTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// The common web types: text, html, css, javascript, json and usual images.
    pub fn defaults() -> Self {
        DEFAULTS.clone()
    }

    pub fn register<E: Into<String>, M: Into<String>>(&mut self, extension: E, mime_type: M) {
        self.known_types.insert(extension.into().to_ascii_lowercase(), mime_type.into());
    }

    /// Guesses the media type of a file from its extension, defaulting to binary data.
    pub fn guess_from(&self, filename: &str) -> &str {
        filename
            .rsplit_once('.')
            .and_then(|(_, extension)| self.known_types.get(&extension.to_ascii_lowercase()))
            .map_or(BINARY_DATA, String::as_str)
    }
}

/// Checks if `media_type` falls under `pattern`, where the pattern may use `*` for its type or subtype.
///
/// A pattern without subtype, such as `text`, stands for `text/*`.
pub fn matches(media_type: &str, pattern: &str) -> bool {
    let (kind, sub_type) = split_media_type(media_type);
    let (pattern_kind, pattern_sub_type) = split_media_type(pattern);

    (pattern_kind == "*" || pattern_kind == kind) && (pattern_sub_type == "*" || pattern_sub_type == sub_type)
}

fn split_media_type(media_type: &str) -> (&str, &str) {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.split_once('/').unwrap_or((essence, "*"))
}
