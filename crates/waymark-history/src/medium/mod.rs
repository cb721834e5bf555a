//! Native history medium
//!
//! The primitive surface a browser (or anything pretending to be one)
//! offers to the backends. Backends own an `Arc<dyn NativeHistory>` and
//! never reach for ambient globals.

mod simulated;

pub use simulated::SimulatedMedium;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::MediumError;

/// External navigation signal
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// `state` is `None` when the event carried no state at all
    PopState { state: Option<Value> },
    HashChange,
}

impl NativeEvent {
    pub fn kind(&self) -> NativeEventKind {
        match self {
            NativeEvent::PopState { .. } => NativeEventKind::PopState,
            NativeEvent::HashChange => NativeEventKind::HashChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeEventKind {
    PopState,
    HashChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

pub type NativeEventHandler = Arc<dyn Fn(&NativeEvent) + Send + Sync>;

/// Engine quirks the backends adapt to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// `push_state` / `replace_state` are available
    pub supports_history: bool,
    /// Hash-only navigations fire `popstate`
    pub supports_popstate_on_hash_change: bool,
    /// `go(n)` between hash entries works without a reload
    pub supports_go_without_reload_using_hash: bool,
    /// `popstate` without state is a real navigation, not a duplicate
    pub fires_popstate_with_undefined_state: bool,
    /// The document has a `<base href>`
    pub has_base_href: bool,
}

impl Capabilities {
    /// User-agent heuristics for engines with known history quirks
    pub fn from_user_agent(ua: &str) -> Self {
        let legacy_android = (ua.contains("Android 2.") || ua.contains("Android 4.0"))
            && ua.contains("Mobile Safari")
            && !ua.contains("Chrome")
            && !ua.contains("Windows Phone");

        Self {
            supports_history: !legacy_android,
            supports_popstate_on_hash_change: !ua.contains("Trident"),
            supports_go_without_reload_using_hash: !ua.contains("Firefox"),
            fires_popstate_with_undefined_state: ua.contains("CriOS"),
            has_base_href: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_history: true,
            supports_popstate_on_hash_change: true,
            supports_go_without_reload_using_hash: true,
            fires_popstate_with_undefined_state: false,
            has_base_href: false,
        }
    }
}

/// Primitive operations on a native session history.
///
/// Implementations must deliver events asynchronously: no handler may run
/// from inside one of these calls.
pub trait NativeHistory: Send + Sync {
    /// Full current URL, hash included
    fn href(&self) -> String;

    /// Opaque state of the current entry
    fn state(&self) -> Result<Value, MediumError>;

    /// Number of entries in the session history
    fn length(&self) -> usize;

    fn push_state(&self, state: Value, href: &str);

    fn replace_state(&self, state: Value, href: &str);

    /// Navigate by assignment; a fragment-only change adds an entry,
    /// anything else loads a new document
    fn assign(&self, href: &str);

    /// Navigate replacing the current entry
    fn replace(&self, href: &str);

    /// Move by a relative offset; out-of-range offsets may be ignored
    fn go(&self, delta: isize);

    fn add_event_listener(&self, kind: NativeEventKind, handler: NativeEventHandler) -> HandlerId;

    fn remove_event_listener(&self, id: HandlerId);

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Blocking yes/no question to the user
    fn confirm(&self, message: &str) -> bool;
}
