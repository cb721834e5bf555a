//! The contract every backend exposes

use serde_json::Value;
use uuid::Uuid;

use waymark_location::{
    add_leading_slash, has_basename, strip_basename, strip_trailing_slash, Location,
    LocationDescriptor,
};

use crate::action::Action;
use crate::disposer::Disposer;
use crate::transition::{Listener, Prompt};
use crate::warning::Warning;
use crate::Result;

pub trait History: Send + Sync {
    /// Size of the addressable history stack
    fn length(&self) -> usize;

    /// The action that produced the current location
    fn action(&self) -> Action;

    fn location(&self) -> Location;

    fn create_href(&self, location: &Location) -> String;

    /// Add an entry. A vetoed push is not an error.
    fn push(&self, to: LocationDescriptor, state: Option<Value>) -> Result<()>;

    /// Overwrite the current entry. A vetoed replace is not an error.
    fn replace(&self, to: LocationDescriptor, state: Option<Value>) -> Result<()>;

    fn go(&self, delta: isize);

    fn go_back(&self) {
        self.go(-1);
    }

    fn go_forward(&self) {
        self.go(1);
    }

    /// Install the blocker consulted before every transition
    fn block(&self, prompt: Prompt) -> Disposer;

    fn listen(&self, listener: Listener) -> Disposer;
}

/// Random entry key; `None` when `length` is zero.
pub(crate) fn create_key(length: usize) -> Option<String> {
    if length == 0 {
        return None;
    }
    let raw = Uuid::new_v4().simple().to_string();
    Some(raw.chars().take(length).collect())
}

/// `"app/"` -> `"/app"`; empty stays empty.
pub(crate) fn normalize_basename(basename: Option<&str>) -> String {
    match basename {
        Some(basename) if !basename.is_empty() => {
            strip_trailing_slash(&add_leading_slash(basename)).to_string()
        }
        _ => String::new(),
    }
}

/// Remove `basename` from a native path, warning when it is missing.
pub(crate) fn strip_native_basename(path: &str, basename: &str) -> String {
    if basename.is_empty() {
        return path.to_string();
    }

    if !has_basename(path, basename) {
        Warning::BasenameMismatch {
            path: path.to_string(),
            basename: basename.to_string(),
        }
        .report();
    }

    strip_basename(path, basename).to_string()
}

pub(crate) fn warn_redundant_state(
    to: &LocationDescriptor,
    state: &Option<Value>,
    operation: &'static str,
) {
    if to.state().is_some() && state.is_some() {
        Warning::RedundantState { operation }.report();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_key() {
        assert_eq!(create_key(6).unwrap().len(), 6);
        assert_eq!(create_key(100).unwrap().len(), 32);
        assert!(create_key(0).is_none());
        assert_ne!(create_key(8), create_key(8));
    }

    #[test]
    fn test_normalize_basename() {
        assert_eq!(normalize_basename(Some("app/")), "/app");
        assert_eq!(normalize_basename(Some("/app")), "/app");
        assert_eq!(normalize_basename(Some("")), "");
        assert_eq!(normalize_basename(None), "");
    }

    #[test]
    fn test_strip_native_basename() {
        assert_eq!(strip_native_basename("/app/users", "/app"), "/users");
        assert_eq!(strip_native_basename("/other", "/app"), "/other");
        assert_eq!(strip_native_basename("/users", ""), "/users");
    }
}
