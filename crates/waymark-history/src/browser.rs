//! Browser history
//!
//! Backed by the native session history: `push_state` / `replace_state`
//! for mutations, `popstate` (plus `hashchange` on engines that skip
//! popstate for hash-only navigations) for external moves. Each native
//! entry stores an [`EntryState`] so a popped entry can be recognized by
//! its key.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use url::Url;

use waymark_location::{
    create_location, create_path, parse_path, strip_trailing_slash, Location, LocationDescriptor,
    ParsedPath,
};

use crate::action::Action;
use crate::disposer::Disposer;
use crate::history::{
    create_key, normalize_basename, strip_native_basename, warn_redundant_state, History,
};
use crate::index::{KeyIndex, Lookup};
use crate::medium::{Capabilities, NativeEvent, NativeEventHandler, NativeEventKind, NativeHistory};
use crate::pop::{handle_pop, PopHandler};
use crate::subscription::EventSubscription;
use crate::transition::{ConfirmCallback, Listener, Prompt, TransitionManager, UserConfirmation};
use crate::warning::Warning;
use crate::Result;

const REPLICATED_MARKER: &str = "/from/";

/// What a browser history writes into each native entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryState {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub state: Option<Value>,
}

impl EntryState {
    /// Foreign or missing native state reads as an empty record.
    pub fn from_native(value: Option<Value>) -> Self {
        value
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn to_native(&self) -> Value {
        json!({ "key": self.key, "state": self.state })
    }
}

#[derive(Clone)]
pub struct BrowserHistoryOptions {
    /// Prefix stripped from native paths and added to hrefs
    pub basename: Option<String>,
    /// Turn every push/replace into a full page load
    pub force_refresh: bool,
    pub key_length: usize,
    /// Asks the user when a prompt produces a message; defaults to the
    /// medium's `confirm`
    pub user_confirmation: Option<UserConfirmation>,
    /// Keep a `/from/<id>` path segment across navigations
    pub replicated: bool,
}

impl Default for BrowserHistoryOptions {
    fn default() -> Self {
        Self {
            basename: None,
            force_refresh: false,
            key_length: 6,
            user_confirmation: None,
            replicated: false,
        }
    }
}

impl std::fmt::Debug for BrowserHistoryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserHistoryOptions")
            .field("basename", &self.basename)
            .field("force_refresh", &self.force_refresh)
            .field("key_length", &self.key_length)
            .field("has_user_confirmation", &self.user_confirmation.is_some())
            .field("replicated", &self.replicated)
            .finish()
    }
}

struct BrowserState {
    length: usize,
    action: Action,
    location: Location,
    keys: KeyIndex<Option<String>>,
    force_next_pop: bool,
    is_blocked: bool,
}

struct BrowserInner {
    medium: Arc<dyn NativeHistory>,
    capabilities: Capabilities,
    basename: String,
    force_refresh: bool,
    key_length: usize,
    replicated: bool,
    user_confirmation: UserConfirmation,
    transitions: TransitionManager,
    subscription: EventSubscription,
    state: Mutex<BrowserState>,
}

#[derive(Clone)]
pub struct BrowserHistory {
    inner: Arc<BrowserInner>,
}

impl BrowserHistory {
    pub fn new(medium: Arc<dyn NativeHistory>, options: BrowserHistoryOptions) -> Result<Self> {
        let capabilities = medium.capabilities();
        let basename = normalize_basename(options.basename.as_deref());

        let raw_state = medium.state().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Native history state unavailable, starting empty");
            Value::Null
        });
        let initial =
            read_location(medium.as_ref(), &basename, options.replicated, Some(raw_state))?;

        let user_confirmation = options.user_confirmation.unwrap_or_else(|| {
            let medium = Arc::clone(&medium);
            let confirm: UserConfirmation =
                Arc::new(move |message: &str, callback: ConfirmCallback| {
                    callback(medium.confirm(message))
                });
            confirm
        });

        let inner = Arc::new_cyclic(|weak: &Weak<BrowserInner>| {
            let mut bindings = vec![(NativeEventKind::PopState, event_handler(weak))];
            if !capabilities.supports_popstate_on_hash_change {
                bindings.push((NativeEventKind::HashChange, event_handler(weak)));
            }

            BrowserInner {
                medium: Arc::clone(&medium),
                capabilities,
                basename,
                force_refresh: options.force_refresh,
                key_length: options.key_length,
                replicated: options.replicated,
                user_confirmation,
                transitions: TransitionManager::new(),
                subscription: EventSubscription::new(Arc::clone(&medium), bindings),
                state: Mutex::new(BrowserState {
                    length: medium.length(),
                    action: Action::Pop,
                    keys: KeyIndex::new(initial.key.clone(), Lookup::First),
                    location: initial,
                    force_next_pop: false,
                    is_blocked: false,
                }),
            }
        });

        tracing::debug!(path = %inner.state.lock().location, "Browser history created");

        Ok(Self { inner })
    }

    /// Id of the `/from/<id>` segment in the native URL, in replicated mode
    pub fn replicated_url(&self) -> Option<String> {
        self.inner.replicated_url()
    }
}

fn event_handler(weak: &Weak<BrowserInner>) -> NativeEventHandler {
    let weak = Weak::clone(weak);
    Arc::new(move |event: &NativeEvent| {
        if let Some(inner) = weak.upgrade() {
            inner.handle_event(event);
        }
    })
}

/// Split the native href into path components.
fn native_path(href: &str) -> ParsedPath {
    match Url::parse(href) {
        Ok(url) => ParsedPath {
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
        },
        Err(e) => {
            tracing::warn!(
                href = %href,
                error = %e,
                "Native URL is not absolute, reading it as a path"
            );
            parse_path(href)
        }
    }
}

/// Locate a `/from/<alphanumeric id>` segment plus trailing slashes.
/// Returns the byte range it covers and the id.
fn find_replicated_segment(pathname: &str) -> Option<(usize, usize, &str)> {
    let mut offset = 0;

    while let Some(found) = pathname[offset..].find(REPLICATED_MARKER) {
        let start = offset + found;
        let id_start = start + REPLICATED_MARKER.len();
        let id_len = pathname[id_start..]
            .bytes()
            .take_while(u8::is_ascii_alphanumeric)
            .count();

        if id_len > 0 {
            let id_end = id_start + id_len;
            let slashes = pathname[id_end..].bytes().take_while(|b| *b == b'/').count();
            return Some((start, id_end + slashes, &pathname[id_start..id_end]));
        }
        offset = id_start;
    }

    None
}

fn strip_replicated_segment(pathname: &str) -> String {
    match find_replicated_segment(pathname) {
        Some((start, end, _)) => {
            let rest = &pathname[end..];
            if rest.is_empty() {
                pathname[..start].to_string()
            } else {
                format!("{}/{}", &pathname[..start], rest)
            }
        }
        None => pathname.to_string(),
    }
}

/// Build a location from the native URL and an entry's raw state.
fn read_location(
    medium: &dyn NativeHistory,
    basename: &str,
    replicated: bool,
    raw_state: Option<Value>,
) -> Result<Location> {
    let entry = EntryState::from_native(raw_state);
    let mut parts = native_path(&medium.href());

    if replicated {
        parts.pathname = strip_replicated_segment(&parts.pathname);
    }

    let path = strip_native_basename(&create_path(&parts), basename);
    Ok(create_location(path.into(), entry.state, entry.key, None)?)
}

impl BrowserInner {
    fn replicated_url(&self) -> Option<String> {
        let parts = native_path(&self.medium.href());
        find_replicated_segment(&parts.pathname).map(|(_, _, id)| id.to_string())
    }

    fn create_href(&self, location: &Location) -> String {
        let path = match self.replicated.then(|| self.replicated_url()).flatten() {
            Some(id) => {
                let replicated = Location {
                    pathname: format!(
                        "{}{}{}",
                        strip_trailing_slash(&location.pathname),
                        REPLICATED_MARKER,
                        id
                    ),
                    ..location.clone()
                };
                create_path(&replicated)
            }
            None => create_path(location),
        };

        format!("{}{}", self.basename, path)
    }

    /// Apply `update`, refresh `length` from the medium and notify.
    fn set_state(&self, update: impl FnOnce(&mut BrowserState)) {
        let length = self.medium.length();
        let (location, action) = {
            let mut state = self.state.lock();
            update(&mut state);
            state.length = length;
            (state.location.clone(), state.action)
        };

        self.transitions.notify_listeners(&location, action);
    }

    fn handle_event(self: &Arc<Self>, event: &NativeEvent) {
        let raw_state = match event {
            NativeEvent::PopState { state } => {
                if state.is_none() && !self.capabilities.fires_popstate_with_undefined_state {
                    tracing::trace!("Ignoring extraneous popstate");
                    return;
                }
                state.clone()
            }
            NativeEvent::HashChange => Some(self.medium.state().unwrap_or(Value::Null)),
        };

        match read_location(self.medium.as_ref(), &self.basename, self.replicated, raw_state) {
            Ok(location) => handle_pop(self, location),
            Err(e) => tracing::error!(error = %e, "Ignoring native navigation"),
        }
    }

    fn commit_push(&self, location: Location) {
        let href = self.create_href(&location);

        if !self.capabilities.supports_history {
            if location.state.is_some() {
                Warning::StateUnsupported { operation: "push" }.report();
            }
            self.medium.assign(&href);
            return;
        }

        if self.force_refresh {
            self.medium.assign(&href);
            return;
        }

        let entry = EntryState {
            key: location.key.clone(),
            state: location.state.clone(),
        };
        self.medium.push_state(entry.to_native(), &href);
        tracing::debug!(href = %href, key = ?location.key, "Pushed entry");

        self.set_state(|state| {
            let current = state.location.key.clone();
            state.keys.record_push(&current, location.key.clone());
            state.action = Action::Push;
            state.location = location;
        });
    }

    fn commit_replace(&self, location: Location) {
        let href = self.create_href(&location);

        if !self.capabilities.supports_history {
            if location.state.is_some() {
                Warning::StateUnsupported {
                    operation: "replace",
                }
                .report();
            }
            self.medium.replace(&href);
            return;
        }

        let entry = EntryState {
            key: location.key.clone(),
            state: location.state.clone(),
        };
        self.medium.replace_state(entry.to_native(), &href);

        if self.force_refresh {
            self.medium.replace(&href);
            return;
        }
        tracing::debug!(href = %href, key = ?location.key, "Replaced entry");

        self.set_state(|state| {
            let current = state.location.key.clone();
            state.keys.record_replace(&current, location.key.clone());
            state.action = Action::Replace;
            state.location = location;
        });
    }
}

impl PopHandler for BrowserInner {
    fn transitions(&self) -> &TransitionManager {
        &self.transitions
    }

    fn user_confirmation(&self) -> Option<UserConfirmation> {
        Some(Arc::clone(&self.user_confirmation))
    }

    fn take_forced_pop(&self) -> bool {
        std::mem::replace(&mut self.state.lock().force_next_pop, false)
    }

    fn arm_forced_pop(&self) {
        self.state.lock().force_next_pop = true;
    }

    fn commit_pop(&self, location: Location) {
        tracing::debug!(path = %location, "Committed POP");
        self.set_state(|state| {
            state.action = Action::Pop;
            state.location = location;
        });
    }

    fn notify_unchanged(&self) {
        self.set_state(|_| {});
    }

    fn revert_delta(&self, pending: &Location) -> isize {
        let state = self.state.lock();
        state.keys.delta(&state.location.key, &pending.key)
    }

    fn go(&self, delta: isize) {
        self.medium.go(delta);
    }
}

impl History for BrowserHistory {
    fn length(&self) -> usize {
        self.inner.state.lock().length
    }

    fn action(&self) -> Action {
        self.inner.state.lock().action
    }

    fn location(&self) -> Location {
        self.inner.state.lock().location.clone()
    }

    fn create_href(&self, location: &Location) -> String {
        self.inner.create_href(location)
    }

    fn push(&self, to: LocationDescriptor, state: Option<Value>) -> Result<()> {
        warn_redundant_state(&to, &state, "push");

        let current = self.location();
        let location =
            create_location(to, state, create_key(self.inner.key_length), Some(&current))?;

        let inner = Arc::clone(&self.inner);
        let target = location.clone();
        self.inner.transitions.confirm_transition_to(
            &location,
            Action::Push,
            Some(&self.inner.user_confirmation),
            move |ok| {
                if ok {
                    inner.commit_push(target);
                }
            },
        );

        Ok(())
    }

    fn replace(&self, to: LocationDescriptor, state: Option<Value>) -> Result<()> {
        warn_redundant_state(&to, &state, "replace");

        let current = self.location();
        let location =
            create_location(to, state, create_key(self.inner.key_length), Some(&current))?;

        let inner = Arc::clone(&self.inner);
        let target = location.clone();
        self.inner.transitions.confirm_transition_to(
            &location,
            Action::Replace,
            Some(&self.inner.user_confirmation),
            move |ok| {
                if ok {
                    inner.commit_replace(target);
                }
            },
        );

        Ok(())
    }

    fn go(&self, delta: isize) {
        self.inner.medium.go(delta);
    }

    fn block(&self, prompt: Prompt) -> Disposer {
        let unblock = self.inner.transitions.set_prompt(prompt);

        let newly_blocked = {
            let mut state = self.inner.state.lock();
            !std::mem::replace(&mut state.is_blocked, true)
        };
        if newly_blocked {
            self.inner.subscription.retain();
        }

        let weak = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                let was_blocked = std::mem::replace(&mut inner.state.lock().is_blocked, false);
                if was_blocked {
                    inner.subscription.release();
                }
            }
            unblock.dispose();
        })
    }

    fn listen(&self, listener: Listener) -> Disposer {
        let unlisten = self.inner.transitions.append_listener(listener);
        self.inner.subscription.retain();

        let weak = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.subscription.release();
            }
            unlisten.dispose();
        })
    }
}

impl std::fmt::Debug for BrowserHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BrowserHistory")
            .field("length", &state.length)
            .field("action", &state.action)
            .field("location", &state.location)
            .field("subscribers", &self.inner.subscription.count())
            .finish()
    }
}
