//! In-memory history
//!
//! No native medium: the entry list and cursor are the whole truth. Used
//! for tests and non-browser hosts.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use waymark_location::{create_location, create_path, Location, LocationDescriptor};

use crate::action::Action;
use crate::disposer::Disposer;
use crate::history::{create_key, warn_redundant_state, History};
use crate::transition::{Listener, Prompt, TransitionManager, UserConfirmation};
use crate::Result;

#[derive(Clone)]
pub struct MemoryHistoryOptions {
    pub initial_entries: Vec<LocationDescriptor>,
    /// Clamped into `0..initial_entries.len()`
    pub initial_index: usize,
    pub key_length: usize,
    pub user_confirmation: Option<UserConfirmation>,
}

impl Default for MemoryHistoryOptions {
    fn default() -> Self {
        Self {
            initial_entries: vec![LocationDescriptor::from("/")],
            initial_index: 0,
            key_length: 6,
            user_confirmation: None,
        }
    }
}

impl std::fmt::Debug for MemoryHistoryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistoryOptions")
            .field("initial_entries", &self.initial_entries)
            .field("initial_index", &self.initial_index)
            .field("key_length", &self.key_length)
            .field("has_user_confirmation", &self.user_confirmation.is_some())
            .finish()
    }
}

struct MemoryState {
    action: Action,
    entries: Vec<Location>,
    index: usize,
}

impl MemoryState {
    fn location(&self) -> &Location {
        &self.entries[self.index]
    }
}

struct MemoryInner {
    key_length: usize,
    user_confirmation: Option<UserConfirmation>,
    transitions: TransitionManager,
    state: Mutex<MemoryState>,
}

#[derive(Clone)]
pub struct MemoryHistory {
    inner: Arc<MemoryInner>,
}

impl MemoryHistory {
    pub fn new(options: MemoryHistoryOptions) -> Result<Self> {
        let mut seeds = options.initial_entries;
        if seeds.is_empty() {
            seeds.push(LocationDescriptor::from("/"));
        }

        let entries = seeds
            .into_iter()
            .map(|seed| {
                let key = seed
                    .key()
                    .map(str::to_string)
                    .or_else(|| create_key(options.key_length));
                create_location(seed, None, key, None)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let index = options.initial_index.min(entries.len() - 1);
        tracing::debug!(entries = entries.len(), index, "Memory history created");

        Ok(Self {
            inner: Arc::new(MemoryInner {
                key_length: options.key_length,
                user_confirmation: options.user_confirmation,
                transitions: TransitionManager::new(),
                state: Mutex::new(MemoryState {
                    action: Action::Pop,
                    entries,
                    index,
                }),
            }),
        })
    }

    /// Cursor into `entries`
    pub fn index(&self) -> usize {
        self.inner.state.lock().index
    }

    pub fn entries(&self) -> Vec<Location> {
        self.inner.state.lock().entries.clone()
    }

    /// Whether `index + delta` stays inside the stack
    pub fn can_go(&self, delta: isize) -> bool {
        let state = self.inner.state.lock();
        let target = (state.index as isize).saturating_add(delta);
        target >= 0 && target < state.entries.len() as isize
    }
}

impl MemoryInner {
    fn set_state(&self, update: impl FnOnce(&mut MemoryState)) {
        let (location, action) = {
            let mut state = self.state.lock();
            update(&mut state);
            (state.location().clone(), state.action)
        };

        self.transitions.notify_listeners(&location, action);
    }
}

impl History for MemoryHistory {
    fn length(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    fn action(&self) -> Action {
        self.inner.state.lock().action
    }

    fn location(&self) -> Location {
        self.inner.state.lock().location().clone()
    }

    fn create_href(&self, location: &Location) -> String {
        create_path(location)
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
            self.inner.user_confirmation.as_ref(),
            move |ok| {
                if !ok {
                    return;
                }
                tracing::debug!(path = %target, "Pushed memory entry");
                inner.set_state(|state| {
                    let next = state.index + 1;
                    state.entries.truncate(next);
                    state.entries.push(target);
                    state.index = next;
                    state.action = Action::Push;
                });
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
            self.inner.user_confirmation.as_ref(),
            move |ok| {
                if !ok {
                    return;
                }
                inner.set_state(|state| {
                    let index = state.index;
                    state.entries[index] = target;
                    state.action = Action::Replace;
                });
            },
        );

        Ok(())
    }

    fn go(&self, delta: isize) {
        let (next, location) = {
            let state = self.inner.state.lock();
            let last = state.entries.len() as isize - 1;
            let next = (state.index as isize).saturating_add(delta).clamp(0, last) as usize;
            (next, state.entries[next].clone())
        };

        let inner = Arc::clone(&self.inner);
        self.inner.transitions.confirm_transition_to(
            &location,
            Action::Pop,
            self.inner.user_confirmation.as_ref(),
            move |ok| {
                if ok {
                    inner.set_state(|state| {
                        // The stack may have shrunk while the user was asked
                        state.index = next.min(state.entries.len() - 1);
                        state.action = Action::Pop;
                    });
                } else {
                    inner.set_state(|_| {});
                }
            },
        );
    }

    fn block(&self, prompt: Prompt) -> Disposer {
        self.inner.transitions.set_prompt(prompt)
    }

    fn listen(&self, listener: Listener) -> Disposer {
        self.inner.transitions.append_listener(listener)
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MemoryHistory")
            .field("index", &state.index)
            .field("length", &state.entries.len())
            .field("action", &state.action)
            .field("location", state.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_support::Recorder;
    use crate::transition::{ConfirmCallback, PromptResult};
    use serde_json::json;
    use waymark_location::PartialLocation;

    fn history_with(paths: &[&str], initial_index: usize) -> MemoryHistory {
        MemoryHistory::new(MemoryHistoryOptions {
            initial_entries: paths.iter().map(|p| LocationDescriptor::from(*p)).collect(),
            initial_index,
            ..MemoryHistoryOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let history = MemoryHistory::new(MemoryHistoryOptions::default()).unwrap();
        assert_eq!(history.length(), 1);
        assert_eq!(history.index(), 0);
        assert_eq!(history.action(), Action::Pop);
        assert_eq!(history.location().pathname, "/");
        assert_eq!(history.location().key.as_ref().map(String::len), Some(6));
    }

    #[test]
    fn test_empty_seed_becomes_root() {
        let history = history_with(&[], 4);
        assert_eq!(history.length(), 1);
        assert_eq!(history.location().pathname, "/");
    }

    #[test]
    fn test_initial_index_is_clamped() {
        let history = history_with(&["/a", "/b", "/c"], 10);
        assert_eq!(history.index(), 2);
        assert_eq!(history.location().pathname, "/c");
    }

    #[test]
    fn test_seed_keeps_provided_key() {
        let partial = PartialLocation {
            pathname: Some("/a".to_string()),
            key: Some("fixed".to_string()),
            ..PartialLocation::default()
        };
        let history = MemoryHistory::new(MemoryHistoryOptions {
            initial_entries: vec![partial.into()],
            ..MemoryHistoryOptions::default()
        })
        .unwrap();
        assert_eq!(history.location().key.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_push_truncates_forward_entries() {
        let history = history_with(&["/a", "/b", "/c"], 0);
        let recorder = Recorder::default();
        let _unlisten = history.listen(recorder.listener());

        history.push("/d".into(), Some(json!({"n": 1}))).unwrap();
        assert_eq!(history.index(), 1);
        assert_eq!(history.length(), 2);
        assert_eq!(history.location().state, Some(json!({"n": 1})));

        let paths: Vec<String> = history.entries().iter().map(|e| e.pathname.clone()).collect();
        assert_eq!(paths, vec!["/a", "/d"]);
        assert_eq!(recorder.calls(), vec![("/d".to_string(), Action::Push)]);
    }

    #[test]
    fn test_replace_overwrites_current() {
        let history = history_with(&["/a", "/b"], 1);
        history.replace("/z".into(), None).unwrap();
        assert_eq!(history.length(), 2);
        assert_eq!(history.index(), 1);
        assert_eq!(history.action(), Action::Replace);
        assert_eq!(history.entries()[1].pathname, "/z");
    }

    #[test]
    fn test_go_clamps() {
        let history = history_with(&["/a", "/b", "/c"], 1);
        history.go(5);
        assert_eq!(history.index(), 2);
        history.go(-10);
        assert_eq!(history.index(), 0);
        history.go_forward();
        assert_eq!(history.location().pathname, "/b");
        assert_eq!(history.action(), Action::Pop);
    }

    #[test]
    fn test_can_go() {
        let history = history_with(&["/a", "/b", "/c"], 1);
        assert!(history.can_go(-1));
        assert!(history.can_go(1));
        assert!(history.can_go(0));
        assert!(!history.can_go(-2));
        assert!(!history.can_go(2));
        assert!(!history.can_go(isize::MAX));
        assert!(!history.can_go(isize::MIN));
    }

    #[test]
    fn test_go_with_extreme_deltas_clamps() {
        let history = history_with(&["/a", "/b", "/c"], 1);
        history.go(isize::MAX);
        assert_eq!(history.index(), 2);
        history.go(isize::MIN);
        assert_eq!(history.index(), 0);
        assert_eq!(history.location().pathname, "/a");
    }

    #[test]
    fn test_blocked_go_notifies_unchanged() {
        let history = history_with(&["/a", "/b"], 1);
        let recorder = Recorder::default();
        let _unlisten = history.listen(recorder.listener());
        let unblock = history.block(Prompt::Block);

        history.go_back();
        assert_eq!(history.index(), 1);
        assert_eq!(recorder.calls(), vec![("/b".to_string(), Action::Pop)]);

        unblock.dispose();
        history.go_back();
        assert_eq!(history.index(), 0);
    }

    #[test]
    fn test_message_prompt_without_confirmation_allows() {
        let history = history_with(&["/"], 0);
        let _unblock = history.block("Leave?".into());
        history.push("/next".into(), None).unwrap();
        assert_eq!(history.location().pathname, "/next");
    }

    #[test]
    fn test_user_confirmation_denies_push() {
        let refuse: UserConfirmation =
            Arc::new(|_: &str, callback: ConfirmCallback| callback(false));
        let history = MemoryHistory::new(MemoryHistoryOptions {
            user_confirmation: Some(refuse),
            ..MemoryHistoryOptions::default()
        })
        .unwrap();
        let _unblock = history.block(Prompt::hook(|_, _| PromptResult::from("Sure?")));

        history.push("/next".into(), None).unwrap();
        assert_eq!(history.length(), 1);
        assert_eq!(history.location().pathname, "/");
    }

    #[test]
    fn test_listener_can_navigate_reentrantly() {
        let history = history_with(&["/"], 0);
        let inner = history.clone();
        let _unlisten = history.listen(Arc::new(move |location: &Location, _: Action| {
            if location.pathname == "/login" {
                inner.replace("/home".into(), None).unwrap();
            }
        }));

        history.push("/login".into(), None).unwrap();
        assert_eq!(history.location().pathname, "/home");
        assert_eq!(history.length(), 2);
    }

    #[test]
    fn test_create_href_and_keyless() {
        let history = MemoryHistory::new(MemoryHistoryOptions {
            key_length: 0,
            ..MemoryHistoryOptions::default()
        })
        .unwrap();
        history.push("/a?b=1#c".into(), None).unwrap();
        assert_eq!(history.location().key, None);
        assert_eq!(history.create_href(&history.location()), "/a?b=1#c");
    }
}
