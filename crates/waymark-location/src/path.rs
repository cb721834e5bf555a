//! Path string helpers
//!
//! Splitting and joining of `pathname?search#hash` strings, basename
//! handling and dot-segment resolution.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Characters `decodeURI` leaves percent-encoded.
const RESERVED: &str = ";/?:@&=+$,#";

/// The three path components of a raw path string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPath {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl std::fmt::Display for ParsedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::location::create_path(self))
    }
}

/// Split a raw path on the first `#`, then on the first `?` of the remainder.
pub fn parse_path(path: &str) -> ParsedPath {
    let mut pathname = if path.is_empty() { "/" } else { path };
    let mut search = "";
    let mut hash = "";

    if let Some(idx) = pathname.find('#') {
        hash = &pathname[idx..];
        pathname = &pathname[..idx];
    }

    if let Some(idx) = pathname.find('?') {
        search = &pathname[idx..];
        pathname = &pathname[..idx];
    }

    ParsedPath {
        pathname: pathname.to_string(),
        search: if search == "?" { String::new() } else { search.to_string() },
        hash: if hash == "#" { String::new() } else { hash.to_string() },
    }
}

pub fn add_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

pub fn strip_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Case-insensitive prefix match that must end on a path boundary.
pub fn has_basename(path: &str, prefix: &str) -> bool {
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }

    let (head, rest) = path.split_at(prefix.len());
    if head.to_lowercase() != prefix.to_lowercase() {
        return false;
    }

    match rest.chars().next() {
        None => true,
        Some(c) => matches!(c, '/' | '?' | '#'),
    }
}

pub fn strip_basename<'a>(path: &'a str, prefix: &str) -> &'a str {
    if has_basename(path, prefix) {
        &path[prefix.len()..]
    } else {
        path
    }
}

/// Drop everything from the first `#` on.
pub fn strip_hash(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Resolve `to` against `from` the way a browser resolves a relative link,
/// collapsing `.` and `..` segments.
pub fn resolve_pathname(to: &str, from: &str) -> String {
    let to_parts: Vec<&str> = if to.is_empty() { Vec::new() } else { to.split('/').collect() };
    let mut parts: Vec<&str> = if from.is_empty() { Vec::new() } else { from.split('/').collect() };

    let is_to_abs = to.starts_with('/');
    let is_from_abs = from.starts_with('/');
    let must_end_abs = is_to_abs || is_from_abs;

    if is_to_abs {
        parts = to_parts;
    } else if !to_parts.is_empty() {
        parts.pop();
        parts.extend(to_parts);
    }

    let Some(last) = parts.last() else {
        return "/".to_string();
    };
    let has_trailing_slash = matches!(*last, "." | ".." | "");

    let mut up = 0usize;
    for i in (0..parts.len()).rev() {
        match parts[i] {
            "." => {
                parts.remove(i);
            }
            ".." => {
                parts.remove(i);
                up += 1;
            }
            _ if up > 0 => {
                parts.remove(i);
                up -= 1;
            }
            _ => {}
        }
    }

    if !must_end_abs {
        for _ in 0..up {
            parts.insert(0, "..");
        }
    }

    let first_is_relative = parts
        .first()
        .map_or(true, |first| !first.is_empty() && !first.starts_with('/'));
    if must_end_abs && first_is_relative {
        parts.insert(0, "");
    }

    let mut result = parts.join("/");
    if has_trailing_slash && !result.ends_with('/') {
        result.push('/');
    }

    result
}

/// Percent-decode with `decodeURI` rules. Returns `None` for malformed
/// escapes or byte sequences that are not valid UTF-8.
pub fn decode_uri(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    // Start of the pending run of decodable escapes
    let mut run = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            flush_escapes(&input[run..i], &mut out)?;
            let ch = input[i..].chars().next()?;
            out.push(ch);
            i += ch.len_utf8();
            run = i;
            continue;
        }

        let byte = hex_byte(bytes, i)?;
        if byte.is_ascii() && RESERVED.contains(byte as char) {
            flush_escapes(&input[run..i], &mut out)?;
            out.push_str(&input[i..i + 3]);
            run = i + 3;
        }
        i += 3;
    }

    flush_escapes(&input[run..], &mut out)?;
    Some(out)
}

/// Decode a run of already validated `%XX` escapes as one UTF-8 sequence.
fn flush_escapes(escapes: &str, out: &mut String) -> Option<()> {
    if !escapes.is_empty() {
        out.push_str(&percent_decode_str(escapes).decode_utf8().ok()?);
    }
    Some(())
}

/// Read a `%XX` escape starting at `at`.
fn hex_byte(bytes: &[u8], at: usize) -> Option<u8> {
    if bytes.get(at) != Some(&b'%') {
        return None;
    }
    let hi = (*bytes.get(at + 1)? as char).to_digit(16)?;
    let lo = (*bytes.get(at + 2)? as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_path() {
        let parsed = parse_path("/a?b#c");
        assert_eq!(parsed.pathname, "/a");
        assert_eq!(parsed.search, "?b");
        assert_eq!(parsed.hash, "#c");

        // Question mark inside the hash belongs to the hash
        let parsed = parse_path("/a#b?c");
        assert_eq!(parsed.pathname, "/a");
        assert_eq!(parsed.search, "");
        assert_eq!(parsed.hash, "#b?c");

        let parsed = parse_path("");
        assert_eq!(parsed.pathname, "/");

        let parsed = parse_path("/a?#");
        assert_eq!(parsed.search, "");
        assert_eq!(parsed.hash, "");
    }

    #[test]
    fn test_basename() {
        assert!(has_basename("/app/users", "/app"));
        assert!(has_basename("/APP?x=1", "/app"));
        assert!(has_basename("/app", "/app"));
        assert!(!has_basename("/application", "/app"));
        assert!(!has_basename("/ap", "/app"));

        assert_eq!(strip_basename("/app/users", "/app"), "/users");
        assert_eq!(strip_basename("/other", "/app"), "/other");
    }

    #[test]
    fn test_slashes() {
        assert_eq!(add_leading_slash("a"), "/a");
        assert_eq!(add_leading_slash("/a"), "/a");
        assert_eq!(strip_leading_slash("/a"), "a");
        assert_eq!(strip_trailing_slash("/app/"), "/app");
        assert_eq!(strip_hash("http://x/a#b"), "http://x/a");
    }

    #[test]
    fn test_resolve_pathname() {
        assert_eq!(resolve_pathname("a/../b", "/x/y"), "/x/b");
        assert_eq!(resolve_pathname("c", "/a/b"), "/a/c");
        assert_eq!(resolve_pathname("./c", "/a/b/"), "/a/b/c");
        assert_eq!(resolve_pathname("..", "/a/b/c"), "/a/");
        assert_eq!(resolve_pathname("../../../z", "/a/b"), "/z");
        assert_eq!(resolve_pathname("/abs", "/a/b"), "/abs");
        assert_eq!(resolve_pathname("", "/a/b"), "/a/b");
        assert_eq!(resolve_pathname("c", "a/b"), "a/c");
    }

    #[test]
    fn test_decode_uri() {
        assert_eq!(decode_uri("/caf%C3%A9").as_deref(), Some("/café"));
        assert_eq!(decode_uri("/a%20b").as_deref(), Some("/a b"));
        // Reserved characters stay encoded
        assert_eq!(decode_uri("/a%2Fb%3f").as_deref(), Some("/a%2Fb%3f"));
        assert!(decode_uri("/%E0%A4%A").is_none());
        assert!(decode_uri("/%zz").is_none());
        assert!(decode_uri("/%C3").is_none());
        assert!(decode_uri("/%80").is_none());
        assert!(decode_uri("/%C3%2F%A9").is_none());
        assert_eq!(decode_uri("/%41%3B%C3%A9x").as_deref(), Some("/A%3Béx"));
    }

    proptest! {
        #[test]
        fn parse_then_create_round_trips(
            pathname in "/[a-z0-9/._-]{0,12}",
            search in "(\\?[a-z0-9=&]{1,8})?",
            hash in "(#[a-z0-9/?]{1,8})?",
        ) {
            let raw = format!("{}{}{}", pathname, search, hash);
            let parsed = parse_path(&raw);
            prop_assert_eq!(parsed.to_string(), raw);
        }
    }
}
