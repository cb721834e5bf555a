//! In-process session history
//!
//! Behaves like a single browser tab: an entry list with a cursor, URL
//! resolution against the current entry, and an event queue that is only
//! drained by `flush`, the way a browser delivers popstate/hashchange on a
//! later task.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use url::{Position, Url};

use super::{
    Capabilities, HandlerId, NativeEvent, NativeEventHandler, NativeEventKind, NativeHistory,
};
use crate::error::MediumError;
use crate::Result;

struct Entry {
    url: Url,
    state: Value,
}

struct Session {
    entries: Vec<Entry>,
    index: usize,
    pending: VecDeque<NativeEvent>,
    /// Full document loads, in order
    page_loads: Vec<String>,
    /// Messages passed to `confirm`
    confirmations: Vec<String>,
    confirm_answer: bool,
    state_unavailable: bool,
    capabilities: Capabilities,
}

impl Session {
    fn current(&self) -> &Entry {
        &self.entries[self.index]
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        match self.current().url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(href = %href, error = %e, "Ignoring navigation to unparseable URL");
                None
            }
        }
    }

    fn add_entry(&mut self, url: Url, state: Value) {
        self.entries.truncate(self.index + 1);
        self.entries.push(Entry { url, state });
        self.index = self.entries.len() - 1;
    }

    fn queue_fragment_events(&mut self, state: Value) {
        if self.capabilities.supports_popstate_on_hash_change {
            self.pending.push_back(NativeEvent::PopState { state: Some(state) });
        }
        self.pending.push_back(NativeEvent::HashChange);
    }
}

fn same_document(a: &Url, b: &Url) -> bool {
    a[..Position::AfterQuery] == b[..Position::AfterQuery]
}

pub struct SimulatedMedium {
    session: Mutex<Session>,
    handlers: Mutex<Vec<(HandlerId, NativeEventKind, NativeEventHandler)>>,
    next_id: AtomicU64,
}

impl SimulatedMedium {
    pub fn new(href: &str) -> Result<Self> {
        let url = Url::parse(href)
            .map_err(|e| MediumError::InvalidUrl(format!("{}: {}", href, e)))?;

        Ok(Self {
            session: Mutex::new(Session {
                entries: vec![Entry {
                    url,
                    state: Value::Null,
                }],
                index: 0,
                pending: VecDeque::new(),
                page_loads: Vec::new(),
                confirmations: Vec::new(),
                confirm_answer: true,
                state_unavailable: false,
                capabilities: Capabilities::default(),
            }),
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        self.session.lock().capabilities = capabilities;
        self
    }

    /// Deliver queued events until the queue is empty, including events
    /// queued by the handlers themselves. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;

        loop {
            let event = self.session.lock().pending.pop_front();
            let Some(event) = event else {
                break;
            };

            let kind = event.kind();
            let handlers: Vec<NativeEventHandler> = self
                .handlers
                .lock()
                .iter()
                .filter(|(_, k, _)| *k == kind)
                .map(|(_, _, handler)| NativeEventHandler::clone(handler))
                .collect();

            for handler in handlers {
                handler(&event);
            }
            delivered += 1;
        }

        delivered
    }

    /// Queue an arbitrary event, e.g. a stray popstate without state
    pub fn dispatch(&self, event: NativeEvent) {
        self.session.lock().pending.push_back(event);
    }

    /// The user pressing the back button
    pub fn back(&self) {
        self.go(-1);
    }

    /// The user pressing the forward button
    pub fn forward(&self) {
        self.go(1);
    }

    /// The user editing the fragment in the address bar
    pub fn navigate_hash(&self, fragment: &str) {
        self.assign(&format!("#{}", fragment));
    }

    pub fn current_index(&self) -> usize {
        self.session.lock().index
    }

    pub fn entry_hrefs(&self) -> Vec<String> {
        self.session
            .lock()
            .entries
            .iter()
            .map(|entry| entry.url.to_string())
            .collect()
    }

    pub fn page_loads(&self) -> Vec<String> {
        self.session.lock().page_loads.clone()
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.session.lock().confirmations.clone()
    }

    pub fn pending_events(&self) -> usize {
        self.session.lock().pending.len()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn set_confirm_answer(&self, answer: bool) {
        self.session.lock().confirm_answer = answer;
    }

    /// Make `state` fail, as some engines do on access
    pub fn set_state_unavailable(&self, unavailable: bool) {
        self.session.lock().state_unavailable = unavailable;
    }
}

impl NativeHistory for SimulatedMedium {
    fn href(&self) -> String {
        self.session.lock().current().url.to_string()
    }

    fn state(&self) -> std::result::Result<Value, MediumError> {
        let session = self.session.lock();
        if session.state_unavailable {
            return Err(MediumError::StateUnavailable("access denied".to_string()));
        }
        Ok(session.current().state.clone())
    }

    fn length(&self) -> usize {
        self.session.lock().entries.len()
    }

    fn push_state(&self, state: Value, href: &str) {
        let mut session = self.session.lock();
        if let Some(url) = session.resolve(href) {
            session.add_entry(url, state);
        }
    }

    fn replace_state(&self, state: Value, href: &str) {
        let mut session = self.session.lock();
        if let Some(url) = session.resolve(href) {
            let index = session.index;
            session.entries[index] = Entry { url, state };
        }
    }

    fn assign(&self, href: &str) {
        let mut session = self.session.lock();
        let Some(url) = session.resolve(href) else {
            return;
        };

        let current = &session.current().url;
        if url.fragment().is_some() && same_document(current, &url) {
            if *current == url {
                return;
            }
            session.add_entry(url, Value::Null);
            session.queue_fragment_events(Value::Null);
        } else {
            session.page_loads.push(url.to_string());
            session.add_entry(url, Value::Null);
        }
    }

    fn replace(&self, href: &str) {
        let mut session = self.session.lock();
        let Some(url) = session.resolve(href) else {
            return;
        };

        let index = session.index;
        let current = &session.current().url;
        if url.fragment().is_some() && same_document(current, &url) {
            if *current == url {
                return;
            }
            session.entries[index] = Entry {
                url,
                state: Value::Null,
            };
            session.queue_fragment_events(Value::Null);
        } else {
            session.page_loads.push(url.to_string());
            session.entries[index] = Entry {
                url,
                state: Value::Null,
            };
        }
    }

    fn go(&self, delta: isize) {
        let mut session = self.session.lock();

        if delta == 0 {
            let href = session.current().url.to_string();
            session.page_loads.push(href);
            return;
        }

        let target = (session.index as isize).saturating_add(delta);
        if target < 0 || target >= session.entries.len() as isize {
            return;
        }

        let previous_fragment = session.current().url.fragment().map(str::to_string);
        session.index = target as usize;

        let state = session.current().state.clone();
        let fragment_changed =
            session.current().url.fragment().map(str::to_string) != previous_fragment;

        session.pending.push_back(NativeEvent::PopState { state: Some(state) });
        if fragment_changed {
            session.pending.push_back(NativeEvent::HashChange);
        }
    }

    fn add_event_listener(&self, kind: NativeEventKind, handler: NativeEventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, kind, handler));
        id
    }

    fn remove_event_listener(&self, id: HandlerId) {
        self.handlers.lock().retain(|(handler_id, _, _)| *handler_id != id);
    }

    fn capabilities(&self) -> Capabilities {
        self.session.lock().capabilities
    }

    fn confirm(&self, message: &str) -> bool {
        let mut session = self.session.lock();
        session.confirmations.push(message.to_string());
        session.confirm_answer
    }
}
