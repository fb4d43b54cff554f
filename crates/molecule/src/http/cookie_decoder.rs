//! Decoding of the request `Cookie` header.
//!
//! Supports plain `name=value` pairs as well as the RFC 2109 form with a leading `$Version`
//! and per-cookie `$Path` and `$Domain` attributes. Values may be quoted, with `\"` escapes.

use crate::http::cookie::Cookie;

const VERSION: &str = "$Version";
const PATH: &str = "$Path";
const DOMAIN: &str = "$Domain";

pub fn decode(header: &str) -> Vec<Cookie> {
    let mut pairs = pairs(header).into_iter().peekable();

    let mut version = 1;
    if let Some((name, value)) = pairs.peek()
        && *name == VERSION
    {
        version = value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(1);
        pairs.next();
    }

    let mut cookies = Vec::new();
    while let Some((name, value)) = pairs.next() {
        let mut cookie = Cookie::new(name, value.unwrap_or_default()).with_version(version);

        if let Some((_, path)) = pairs.next_if(|(name, _)| *name == PATH) {
            cookie = cookie.with_path(path);
        }
        if let Some((_, Some(domain))) = pairs.next_if(|(name, _)| *name == DOMAIN) {
            cookie = cookie.with_domain(domain);
        }

        cookies.push(cookie);
    }
    cookies
}

fn pairs(header: &str) -> Vec<(&str, Option<String>)> {
    let bytes = header.as_bytes();
    let mut pairs = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b';' | b',') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let start = pos;
        while pos < bytes.len() && !matches!(bytes[pos], b';' | b',' | b'=') {
            pos += 1;
        }
        let name = header[start..pos].trim();

        if pos < bytes.len() && bytes[pos] == b'=' {
            pos += 1;
            let (value, end) = value(header, pos);
            pos = end;
            pairs.push((name, Some(value)));
        } else {
            pairs.push((name, None));
        }
    }
    pairs
}

fn value(header: &str, start: usize) -> (String, usize) {
    let bytes = header.as_bytes();
    if bytes.get(start) == Some(&b'"')
        && let Some(end) = closing_quote(bytes, start + 1)
    {
        return (unescape(&header[start + 1..end]), end + 1);
    }

    let mut end = start;
    while end < bytes.len() && !matches!(bytes[end], b';' | b',') {
        end += 1;
    }
    (header[start..end].trim().to_string(), end)
}

fn closing_quote(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if bytes.get(pos + 1) == Some(&b'"') => pos += 2,
            b'"' => return Some(pos),
            _ => pos += 1,
        }
    }
    None
}

fn unescape(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\\\", "\\")
}
