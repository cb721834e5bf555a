//! Location values
//!
//! A location is created on every navigation and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LocationError;
use crate::path::{decode_uri, parse_path, resolve_pathname, ParsedPath};
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Decoded path, always non-empty
    pub pathname: String,
    /// Empty or starting with `?`
    pub search: String,
    /// Empty or starting with `#`
    pub hash: String,
    /// Caller-owned state; `None` when no state was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Entry key; hash locations never carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Location {
    /// `pathname + search + hash`
    pub fn path(&self) -> String {
        create_path(self)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Location fields a caller may leave out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialLocation {
    pub pathname: Option<String>,
    pub search: Option<String>,
    pub hash: Option<String>,
    pub state: Option<Value>,
    pub key: Option<String>,
}

/// What a caller navigates to: a raw path or a partial location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationDescriptor {
    Path(String),
    Partial(PartialLocation),
}

impl LocationDescriptor {
    /// State carried by the descriptor itself
    pub fn state(&self) -> Option<&Value> {
        match self {
            LocationDescriptor::Path(_) => None,
            LocationDescriptor::Partial(partial) => partial.state.as_ref(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            LocationDescriptor::Path(_) => None,
            LocationDescriptor::Partial(partial) => partial.key.as_deref(),
        }
    }
}

impl From<&str> for LocationDescriptor {
    fn from(path: &str) -> Self {
        LocationDescriptor::Path(path.to_string())
    }
}

impl From<String> for LocationDescriptor {
    fn from(path: String) -> Self {
        LocationDescriptor::Path(path)
    }
}

impl From<PartialLocation> for LocationDescriptor {
    fn from(partial: PartialLocation) -> Self {
        LocationDescriptor::Partial(partial)
    }
}

impl From<Location> for LocationDescriptor {
    fn from(location: Location) -> Self {
        LocationDescriptor::Partial(PartialLocation {
            pathname: Some(location.pathname),
            search: Some(location.search),
            hash: Some(location.hash),
            state: location.state,
            key: location.key,
        })
    }
}

/// Anything with the three path components
pub trait PathLike {
    fn pathname(&self) -> &str;
    fn search(&self) -> &str;
    fn hash(&self) -> &str;
}

impl PathLike for Location {
    fn pathname(&self) -> &str {
        &self.pathname
    }

    fn search(&self) -> &str {
        &self.search
    }

    fn hash(&self) -> &str {
        &self.hash
    }
}

impl PathLike for ParsedPath {
    fn pathname(&self) -> &str {
        &self.pathname
    }

    fn search(&self) -> &str {
        &self.search
    }

    fn hash(&self) -> &str {
        &self.hash
    }
}

/// Reassemble a path, skipping empty or bare `?` / `#` parts.
pub fn create_path<P: PathLike + ?Sized>(location: &P) -> String {
    let pathname = location.pathname();
    let mut path = if pathname.is_empty() {
        "/".to_string()
    } else {
        pathname.to_string()
    };

    let search = location.search();
    if !search.is_empty() && search != "?" {
        if !search.starts_with('?') {
            path.push('?');
        }
        path.push_str(search);
    }

    let hash = location.hash();
    if !hash.is_empty() && hash != "#" {
        if !hash.starts_with('#') {
            path.push('#');
        }
        path.push_str(hash);
    }

    path
}

/// Build a normalized location.
///
/// A `key` argument overrides any key on a partial descriptor. A relative
/// pathname is resolved against `current`; an empty one inherits it.
pub fn create_location(
    descriptor: LocationDescriptor,
    state: Option<Value>,
    key: Option<String>,
    current: Option<&Location>,
) -> Result<Location> {
    let mut location = match descriptor {
        LocationDescriptor::Path(path) => {
            let parsed = parse_path(&path);
            Location {
                pathname: parsed.pathname,
                search: parsed.search,
                hash: parsed.hash,
                state,
                key: None,
            }
        }
        LocationDescriptor::Partial(partial) => Location {
            pathname: partial.pathname.unwrap_or_default(),
            search: with_prefix(partial.search, '?'),
            hash: with_prefix(partial.hash, '#'),
            state: partial.state.or(state),
            key: partial.key,
        },
    };

    location.pathname = decode_uri(&location.pathname).ok_or_else(|| LocationError::PathDecode {
        pathname: location.pathname.clone(),
    })?;

    if let Some(key) = key {
        location.key = Some(key);
    }

    match current {
        Some(current) => {
            if location.pathname.is_empty() {
                location.pathname = current.pathname.clone();
            } else if !location.pathname.starts_with('/') {
                location.pathname = resolve_pathname(&location.pathname, &current.pathname);
            }
        }
        None => {
            if location.pathname.is_empty() {
                location.pathname = "/".to_string();
            }
        }
    }

    Ok(location)
}

fn with_prefix(part: Option<String>, prefix: char) -> String {
    match part {
        Some(part) if !part.is_empty() => {
            if part.starts_with(prefix) {
                part
            } else {
                format!("{}{}", prefix, part)
            }
        }
        _ => String::new(),
    }
}

/// Structural equality, including key and deep state equality.
pub fn locations_are_equal(a: &Location, b: &Location) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current(pathname: &str) -> Location {
        Location {
            pathname: pathname.to_string(),
            ..Location::default()
        }
    }

    #[test]
    fn test_create_from_path() {
        let location =
            create_location("/a?b#c".into(), Some(json!({"x": 1})), Some("k1".into()), None)
                .unwrap();
        assert_eq!(location.pathname, "/a");
        assert_eq!(location.search, "?b");
        assert_eq!(location.hash, "#c");
        assert_eq!(location.state, Some(json!({"x": 1})));
        assert_eq!(location.key.as_deref(), Some("k1"));
        assert_eq!(create_path(&location), "/a?b#c");
    }

    #[test]
    fn test_create_from_partial() {
        let partial = PartialLocation {
            pathname: Some("/users".to_string()),
            search: Some("page=2".to_string()),
            hash: Some("top".to_string()),
            ..PartialLocation::default()
        };
        let location = create_location(partial.into(), None, None, None).unwrap();
        assert_eq!(location.search, "?page=2");
        assert_eq!(location.hash, "#top");
        assert_eq!(location.path(), "/users?page=2#top");
    }

    #[test]
    fn test_partial_state_wins_over_argument() {
        let partial = PartialLocation {
            pathname: Some("/a".to_string()),
            state: Some(json!("inner")),
            ..PartialLocation::default()
        };
        let location =
            create_location(partial.into(), Some(json!("outer")), None, None).unwrap();
        assert_eq!(location.state, Some(json!("inner")));
    }

    #[test]
    fn test_relative_resolution() {
        let location =
            create_location("a/../b".into(), None, None, Some(&current("/x/y"))).unwrap();
        assert_eq!(location.pathname, "/x/b");

        let location = create_location("?q=1".into(), None, None, Some(&current("/x/y"))).unwrap();
        assert_eq!(location.pathname, "/x/y");
        assert_eq!(location.search, "?q=1");

        let partial = PartialLocation {
            hash: Some("#frag".to_string()),
            ..PartialLocation::default()
        };
        let location = create_location(partial.into(), None, None, None).unwrap();
        assert_eq!(location.pathname, "/");
    }

    #[test]
    fn test_decode_failure() {
        let err = create_location("/%E0%A4%A".into(), None, None, None).unwrap_err();
        assert_eq!(
            err,
            LocationError::PathDecode {
                pathname: "/%E0%A4%A".to_string()
            }
        );
    }

    #[test]
    fn test_pathname_is_decoded() {
        let location = create_location("/caf%C3%A9?x=%20".into(), None, None, None).unwrap();
        assert_eq!(location.pathname, "/café");
        // Only the pathname is decoded
        assert_eq!(location.search, "?x=%20");
    }

    #[test]
    fn test_equality() {
        let a = create_location("/a".into(), Some(json!({"n": [1, 2]})), Some("k".into()), None)
            .unwrap();
        let b = create_location("/a".into(), Some(json!({"n": [1, 2]})), Some("k".into()), None)
            .unwrap();
        assert!(locations_are_equal(&a, &b));

        let c = create_location("/a".into(), Some(json!({"n": [2, 1]})), Some("k".into()), None)
            .unwrap();
        assert!(!locations_are_equal(&a, &c));

        let d = create_location("/a".into(), Some(json!({"n": [1, 2]})), Some("j".into()), None)
            .unwrap();
        assert!(!locations_are_equal(&a, &d));
    }
}
