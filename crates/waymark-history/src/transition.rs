//! Transition Manager
//!
//! Holds the single active prompt and the listener registry shared by
//! every backend. Each mutating operation asks `confirm_transition_to`
//! before committing anything.
//!
//! No lock is held while prompts, confirmations or listeners run, so any
//! of them may call back into the history that owns this manager.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use waymark_location::Location;

use crate::action::Action;
use crate::disposer::Disposer;
use crate::warning::Warning;

pub type Listener = Arc<dyn Fn(&Location, Action) + Send + Sync>;
pub type PromptHook = Arc<dyn Fn(&Location, Action) -> PromptResult + Send + Sync>;
/// Receives the user's answer; may be called on a later turn.
pub type ConfirmCallback = Box<dyn FnOnce(bool) + Send>;
pub type UserConfirmation = Arc<dyn Fn(&str, ConfirmCallback) + Send + Sync>;

/// A blocker installed with `block`
#[derive(Clone)]
pub enum Prompt {
    /// Veto every transition without asking
    Block,
    /// Ask the user with a fixed message
    Message(String),
    /// Decide per transition
    Hook(PromptHook),
}

impl Prompt {
    pub fn message(message: impl Into<String>) -> Self {
        Prompt::Message(message.into())
    }

    pub fn hook<F>(hook: F) -> Self
    where
        F: Fn(&Location, Action) -> PromptResult + Send + Sync + 'static,
    {
        Prompt::Hook(Arc::new(hook))
    }
}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prompt::Block => f.write_str("Block"),
            Prompt::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Prompt::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

impl From<&str> for Prompt {
    fn from(message: &str) -> Self {
        Prompt::Message(message.to_string())
    }
}

impl From<String> for Prompt {
    fn from(message: String) -> Self {
        Prompt::Message(message)
    }
}

/// What a prompt hook answers for one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    Allow,
    Deny,
    /// Ask the user through the configured confirmation function
    Message(String),
}

impl From<bool> for PromptResult {
    fn from(allow: bool) -> Self {
        if allow {
            PromptResult::Allow
        } else {
            PromptResult::Deny
        }
    }
}

impl From<&str> for PromptResult {
    fn from(message: &str) -> Self {
        PromptResult::Message(message.to_string())
    }
}

impl From<String> for PromptResult {
    fn from(message: String) -> Self {
        PromptResult::Message(message)
    }
}

struct ActivePrompt {
    id: u64,
    prompt: Prompt,
}

struct ListenerEntry {
    id: u64,
    active: Arc<AtomicBool>,
    listener: Listener,
}

pub struct TransitionManager {
    prompt: Arc<Mutex<Option<ActivePrompt>>>,
    listeners: Arc<Mutex<Vec<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl TransitionManager {
    pub fn new() -> Self {
        Self {
            prompt: Arc::new(Mutex::new(None)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Install `prompt` as the only blocker. The returned disposer clears it
    /// only while it is still the installed one.
    pub fn set_prompt(&self, prompt: Prompt) -> Disposer {
        let id = self.next_id();

        {
            let mut slot = self.prompt.lock();
            if slot.is_some() {
                Warning::DuplicatePrompt.report();
            }
            *slot = Some(ActivePrompt { id, prompt });
        }

        let slot = Arc::downgrade(&self.prompt);
        Disposer::new(move || {
            if let Some(slot) = slot.upgrade() {
                let mut slot = slot.lock();
                if slot.as_ref().map(|active| active.id) == Some(id) {
                    *slot = None;
                }
            }
        })
    }

    pub fn has_prompt(&self) -> bool {
        self.prompt.lock().is_some()
    }

    /// Decide whether a transition may proceed and report it to `callback`.
    ///
    /// The callback runs synchronously unless the prompt asks the user, in
    /// which case it runs whenever `user_confirmation` answers. Two pending
    /// confirmations are not serialized; each resolves independently.
    pub fn confirm_transition_to<F>(
        &self,
        location: &Location,
        action: Action,
        user_confirmation: Option<&UserConfirmation>,
        callback: F,
    ) where
        F: FnOnce(bool) + Send + 'static,
    {
        let prompt = self.prompt.lock().as_ref().map(|active| active.prompt.clone());

        let Some(prompt) = prompt else {
            callback(true);
            return;
        };

        let result = match prompt {
            Prompt::Block => PromptResult::Deny,
            Prompt::Message(message) => PromptResult::Message(message),
            Prompt::Hook(hook) => hook(location, action),
        };

        match result {
            PromptResult::Message(message) => match user_confirmation {
                Some(confirm) => {
                    tracing::debug!(
                        action = %action,
                        path = %location,
                        "Awaiting user confirmation"
                    );
                    confirm(&message, Box::new(callback));
                }
                None => {
                    Warning::MissingUserConfirmation.report();
                    callback(true);
                }
            },
            PromptResult::Deny => callback(false),
            PromptResult::Allow => callback(true),
        }
    }

    pub fn append_listener(&self, listener: Listener) -> Disposer {
        let id = self.next_id();
        let active = Arc::new(AtomicBool::new(true));

        self.listeners.lock().push(ListenerEntry {
            id,
            active: Arc::clone(&active),
            listener,
        });

        let listeners = Arc::downgrade(&self.listeners);
        Disposer::new(move || {
            active.store(false, Ordering::SeqCst);
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().retain(|entry| entry.id != id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Call every active listener in registration order.
    ///
    /// A listener removed by an earlier one in the same round is skipped.
    /// A panicking listener unwinds to the caller and the listeners after
    /// it are not called for this round.
    pub fn notify_listeners(&self, location: &Location, action: Action) {
        let round: Vec<(Arc<AtomicBool>, Listener)> = self
            .listeners
            .lock()
            .iter()
            .map(|entry| (Arc::clone(&entry.active), Arc::clone(&entry.listener)))
            .collect();

        for (active, listener) in round {
            if active.load(Ordering::SeqCst) {
                listener(location, action);
            }
        }
    }
}

impl Default for TransitionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn location(path: &str) -> Location {
        waymark_location::create_location(path.into(), None, None, None).unwrap()
    }

    fn decide(manager: &TransitionManager, confirm: Option<&UserConfirmation>) -> Option<bool> {
        let answer = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&answer);
        manager.confirm_transition_to(&location("/next"), Action::Push, confirm, move |ok| {
            *slot.lock() = Some(ok);
        });
        let result = *answer.lock();
        result
    }

    #[test]
    fn test_no_prompt_confirms() {
        let manager = TransitionManager::new();
        assert_eq!(decide(&manager, None), Some(true));
    }

    #[test]
    fn test_block_denies() {
        let manager = TransitionManager::new();
        let unblock = manager.set_prompt(Prompt::Block);
        assert_eq!(decide(&manager, None), Some(false));

        unblock.dispose();
        assert_eq!(decide(&manager, None), Some(true));
    }

    #[test]
    fn test_hook_results() {
        let manager = TransitionManager::new();
        let unblock = manager.set_prompt(Prompt::hook(|location, action| {
            assert_eq!(action, Action::Push);
            (location.pathname != "/next").into()
        }));
        assert_eq!(decide(&manager, None), Some(false));
        unblock.dispose();

        let _unblock = manager.set_prompt(Prompt::hook(|_, _| PromptResult::Allow));
        assert_eq!(decide(&manager, None), Some(true));
    }

    #[test]
    fn test_message_uses_user_confirmation() {
        let manager = TransitionManager::new();
        let _unblock = manager.set_prompt("Leave?".into());

        let seen = Arc::new(Mutex::new(String::new()));
        let seen_in = Arc::clone(&seen);
        let confirm: UserConfirmation = Arc::new(move |message: &str, callback: ConfirmCallback| {
            *seen_in.lock() = message.to_string();
            callback(false);
        });

        assert_eq!(decide(&manager, Some(&confirm)), Some(false));
        assert_eq!(seen.lock().as_str(), "Leave?");

        // Without a confirmation function the transition goes through
        assert_eq!(decide(&manager, None), Some(true));
    }

    #[test]
    fn test_deferred_confirmation() {
        let manager = TransitionManager::new();
        let _unblock = manager.set_prompt(Prompt::hook(|_, _| "Sure?".into()));

        let pending: Arc<Mutex<Option<ConfirmCallback>>> = Arc::new(Mutex::new(None));
        let parked = Arc::clone(&pending);
        let confirm: UserConfirmation = Arc::new(move |_: &str, callback: ConfirmCallback| {
            *parked.lock() = Some(callback);
        });

        assert_eq!(decide(&manager, Some(&confirm)), None);

        let answer = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&answer);
        manager.confirm_transition_to(&location("/x"), Action::Pop, Some(&confirm), move |ok| {
            *slot.lock() = Some(ok);
        });
        let callback = pending.lock().take().unwrap();
        callback(true);
        assert_eq!(*answer.lock(), Some(true));
    }

    #[test]
    fn test_stale_unblock_keeps_newer_prompt() {
        let manager = TransitionManager::new();
        let first = manager.set_prompt(Prompt::Block);
        let _second = manager.set_prompt(Prompt::Block);

        first.dispose();
        assert!(manager.has_prompt());
        assert_eq!(decide(&manager, None), Some(false));
    }

    #[test]
    fn test_listeners_in_order_and_disposal() {
        let manager = TransitionManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first_order = Arc::clone(&order);
        let first = manager.append_listener(Arc::new(move |_: &Location, _: Action| {
            first_order.lock().push(1)
        }));
        let second_order = Arc::clone(&order);
        let _second = manager.append_listener(Arc::new(move |_: &Location, _: Action| {
            second_order.lock().push(2)
        }));

        manager.notify_listeners(&location("/"), Action::Pop);
        assert_eq!(*order.lock(), vec![1, 2]);

        first.dispose();
        first.dispose();
        assert_eq!(manager.listener_count(), 1);

        manager.notify_listeners(&location("/"), Action::Pop);
        assert_eq!(*order.lock(), vec![1, 2, 2]);
    }

    #[test]
    fn test_listener_removed_mid_round_is_skipped() {
        let manager = Arc::new(TransitionManager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let victim: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));

        let killer_victim = Arc::clone(&victim);
        let _killer = manager.append_listener(Arc::new(move |_: &Location, _: Action| {
            if let Some(disposer) = killer_victim.lock().as_ref() {
                disposer.dispose();
            }
        }));

        let counter = Arc::clone(&calls);
        *victim.lock() = Some(manager.append_listener(Arc::new(move |_: &Location, _: Action| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        manager.notify_listeners(&location("/"), Action::Pop);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
