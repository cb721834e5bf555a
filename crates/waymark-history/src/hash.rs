//! Hash history
//!
//! Stores the path in the URL fragment. Native entries carry no state, so
//! locations are keyless and identified by their path string.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};

use waymark_location::{
    add_leading_slash, create_location, create_path, strip_hash, strip_leading_slash, Location,
    LocationDescriptor, PartialLocation,
};

use crate::action::Action;
use crate::disposer::Disposer;
use crate::history::{normalize_basename, strip_native_basename, History};
use crate::index::{KeyIndex, Lookup};
use crate::medium::{Capabilities, NativeEvent, NativeEventHandler, NativeEventKind, NativeHistory};
use crate::pop::{handle_pop, PopHandler};
use crate::subscription::EventSubscription;
use crate::transition::{ConfirmCallback, Listener, Prompt, TransitionManager, UserConfirmation};
use crate::warning::Warning;
use crate::Result;

/// How a path is written into the fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    /// `#/home`
    #[default]
    Slash,
    /// `#home`
    NoSlash,
    /// `#!/home`
    HashBang,
}

impl HashType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashType::Slash => "slash",
            HashType::NoSlash => "noslash",
            HashType::HashBang => "hashbang",
        }
    }

    pub fn encode_path(&self, path: &str) -> String {
        match self {
            HashType::Slash => add_leading_slash(path),
            HashType::NoSlash => strip_leading_slash(path).to_string(),
            HashType::HashBang => {
                if path.starts_with('!') {
                    path.to_string()
                } else {
                    format!("!/{}", strip_leading_slash(path))
                }
            }
        }
    }

    pub fn decode_path(&self, path: &str) -> String {
        match self {
            HashType::Slash | HashType::NoSlash => add_leading_slash(path),
            HashType::HashBang => add_leading_slash(path.strip_prefix('!').unwrap_or(path)),
        }
    }
}

impl std::fmt::Display for HashType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HashType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "slash" => Ok(HashType::Slash),
            "noslash" => Ok(HashType::NoSlash),
            "hashbang" => Ok(HashType::HashBang),
            _ => Err(format!("Unknown hash type: {}", s)),
        }
    }
}

#[derive(Clone, Default)]
pub struct HashHistoryOptions {
    pub basename: Option<String>,
    pub hash_type: HashType,
    /// Defaults to the medium's `confirm`
    pub user_confirmation: Option<UserConfirmation>,
}

impl std::fmt::Debug for HashHistoryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashHistoryOptions")
            .field("basename", &self.basename)
            .field("hash_type", &self.hash_type)
            .field("has_user_confirmation", &self.user_confirmation.is_some())
            .finish()
    }
}

struct HashState {
    length: usize,
    action: Action,
    location: Location,
    paths: KeyIndex<String>,
    force_next_pop: bool,
    /// Path of our own push/replace whose hashchange should be skipped
    ignore_path: Option<String>,
    is_blocked: bool,
}

struct HashInner {
    medium: Arc<dyn NativeHistory>,
    capabilities: Capabilities,
    basename: String,
    hash_type: HashType,
    user_confirmation: UserConfirmation,
    transitions: TransitionManager,
    subscription: EventSubscription,
    state: Mutex<HashState>,
}

#[derive(Clone)]
pub struct HashHistory {
    inner: Arc<HashInner>,
}

/// Everything after the first `#` of the raw href, undecoded.
fn hash_path(medium: &dyn NativeHistory) -> String {
    let href = medium.href();
    match href.find('#') {
        Some(i) => href[i + 1..].to_string(),
        None => String::new(),
    }
}

fn replace_hash_path(medium: &dyn NativeHistory, path: &str) {
    let href = medium.href();
    medium.replace(&format!("{}#{}", strip_hash(&href), path));
}

fn same_path(a: &Location, b: &Location) -> bool {
    a.pathname == b.pathname && a.search == b.search && a.hash == b.hash
}

/// Drop `state` and `key` from a descriptor; the fragment cannot hold them.
fn without_state(to: LocationDescriptor) -> LocationDescriptor {
    match to {
        LocationDescriptor::Partial(partial) => LocationDescriptor::Partial(PartialLocation {
            state: None,
            key: None,
            ..partial
        }),
        path => path,
    }
}

impl HashHistory {
    pub fn new(medium: Arc<dyn NativeHistory>, options: HashHistoryOptions) -> Result<Self> {
        let capabilities = medium.capabilities();
        let basename = normalize_basename(options.basename.as_deref());
        let hash_type = options.hash_type;

        let raw = hash_path(medium.as_ref());
        let encoded = hash_type.encode_path(&raw);
        if raw != encoded {
            tracing::debug!(from = %raw, to = %encoded, "Correcting initial hash");
            replace_hash_path(medium.as_ref(), &encoded);
        }

        let initial = read_location(medium.as_ref(), &basename, hash_type)?;

        let user_confirmation = options.user_confirmation.unwrap_or_else(|| {
            let medium = Arc::clone(&medium);
            let confirm: UserConfirmation =
                Arc::new(move |message: &str, callback: ConfirmCallback| {
                    callback(medium.confirm(message))
                });
            confirm
        });

        let inner = Arc::new_cyclic(|weak: &Weak<HashInner>| {
            let weak = Weak::clone(weak);
            let handler: NativeEventHandler = Arc::new(move |_: &NativeEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_hash_change();
                }
            });

            HashInner {
                medium: Arc::clone(&medium),
                capabilities,
                basename,
                hash_type,
                user_confirmation,
                transitions: TransitionManager::new(),
                subscription: EventSubscription::new(
                    Arc::clone(&medium),
                    vec![(NativeEventKind::HashChange, handler)],
                ),
                state: Mutex::new(HashState {
                    length: medium.length(),
                    action: Action::Pop,
                    paths: KeyIndex::new(create_path(&initial), Lookup::Last),
                    location: initial,
                    force_next_pop: false,
                    ignore_path: None,
                    is_blocked: false,
                }),
            }
        });

        tracing::debug!(
            hash_type = %hash_type,
            path = %inner.state.lock().location,
            "Hash history created"
        );

        Ok(Self { inner })
    }
}

fn read_location(
    medium: &dyn NativeHistory,
    basename: &str,
    hash_type: HashType,
) -> Result<Location> {
    let path = hash_type.decode_path(&hash_path(medium));
    let path = strip_native_basename(&path, basename);
    Ok(create_location(path.into(), None, None, None)?)
}

impl HashInner {
    fn encoded(&self, path: &str) -> String {
        self.hash_type.encode_path(&format!("{}{}", self.basename, path))
    }

    fn create_href(&self, location: &Location) -> String {
        let prefix = if self.capabilities.has_base_href {
            strip_hash(&self.medium.href()).to_string()
        } else {
            String::new()
        };
        format!("{}#{}", prefix, self.encoded(&create_path(location)))
    }

    fn set_state(&self, update: impl FnOnce(&mut HashState)) {
        let length = self.medium.length();
        let (location, action) = {
            let mut state = self.state.lock();
            update(&mut state);
            state.length = length;
            (state.location.clone(), state.action)
        };

        self.transitions.notify_listeners(&location, action);
    }

    fn handle_hash_change(self: &Arc<Self>) {
        let raw = hash_path(self.medium.as_ref());
        let encoded = self.hash_type.encode_path(&raw);

        if raw != encoded {
            tracing::debug!(from = %raw, to = %encoded, "Correcting non-canonical hash");
            replace_hash_path(self.medium.as_ref(), &encoded);
            return;
        }

        let location = match read_location(self.medium.as_ref(), &self.basename, self.hash_type) {
            Ok(location) => location,
            Err(e) => {
                tracing::error!(error = %e, "Ignoring hash change");
                return;
            }
        };

        {
            let mut state = self.state.lock();
            if !state.force_next_pop && same_path(&state.location, &location) {
                return;
            }
            if state.ignore_path.as_deref() == Some(create_path(&location).as_str()) {
                return;
            }
            state.ignore_path = None;
        }

        handle_pop(self, location);
    }

    fn commit_push(&self, location: Location) {
        let path = create_path(&location);
        let encoded = self.encoded(&path);

        if hash_path(self.medium.as_ref()) == encoded {
            Warning::SamePathPush.report();
            self.set_state(|_| {});
            return;
        }

        self.state.lock().ignore_path = Some(path.clone());
        self.medium.assign(&format!("#{}", encoded));
        tracing::debug!(path = %path, "Pushed hash");

        self.set_state(|state| {
            let current = create_path(&state.location);
            state.paths.record_push(&current, path);
            state.action = Action::Push;
            state.location = location;
        });
    }

    fn commit_replace(&self, location: Location) {
        let path = create_path(&location);
        let encoded = self.encoded(&path);

        if hash_path(self.medium.as_ref()) != encoded {
            self.state.lock().ignore_path = Some(path.clone());
            replace_hash_path(self.medium.as_ref(), &encoded);
        }
        tracing::debug!(path = %path, "Replaced hash");

        self.set_state(|state| {
            let current = create_path(&state.location);
            state.paths.record_replace(&current, path);
            state.action = Action::Replace;
            state.location = location;
        });
    }
}

impl PopHandler for HashInner {
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
        state
            .paths
            .delta(&create_path(&state.location), &create_path(pending))
    }

    fn go(&self, delta: isize) {
        self.medium.go(delta);
    }
}

impl History for HashHistory {
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
        if state.is_some() || to.state().is_some() {
            Warning::StateIgnored { operation: "push" }.report();
        }

        let current = self.location();
        let location = create_location(without_state(to), None, None, Some(&current))?;

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
        if state.is_some() || to.state().is_some() {
            Warning::StateIgnored {
                operation: "replace",
            }
            .report();
        }

        let current = self.location();
        let location = create_location(without_state(to), None, None, Some(&current))?;

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
        if !self.inner.capabilities.supports_go_without_reload_using_hash {
            Warning::GoReloadsPage.report();
        }
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

impl std::fmt::Debug for HashHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("HashHistory")
            .field("hash_type", &self.inner.hash_type)
            .field("length", &state.length)
            .field("action", &state.action)
            .field("location", &state.location)
            .field("subscribers", &self.inner.subscription.count())
            .finish()
    }
}
