//! Reference-counted native event subscription
//!
//! Handlers are installed on the medium when the count goes 0 -> 1 and
//! removed when it returns to 0. `listen` registrations and an active
//! `block` each hold one reference.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::medium::{HandlerId, NativeEventHandler, NativeEventKind, NativeHistory};

struct SubscriptionState {
    count: usize,
    installed: Vec<HandlerId>,
}

pub(crate) struct EventSubscription {
    medium: Arc<dyn NativeHistory>,
    bindings: Vec<(NativeEventKind, NativeEventHandler)>,
    state: Mutex<SubscriptionState>,
}

impl EventSubscription {
    pub(crate) fn new(
        medium: Arc<dyn NativeHistory>,
        bindings: Vec<(NativeEventKind, NativeEventHandler)>,
    ) -> Self {
        Self {
            medium,
            bindings,
            state: Mutex::new(SubscriptionState {
                count: 0,
                installed: Vec::new(),
            }),
        }
    }

    pub(crate) fn retain(&self) {
        let mut state = self.state.lock();
        state.count += 1;

        if state.count == 1 {
            for (kind, handler) in &self.bindings {
                let id = self.medium.add_event_listener(*kind, Arc::clone(handler));
                state.installed.push(id);
            }
            tracing::trace!(handlers = state.installed.len(), "Installed native history handlers");
        }
    }

    pub(crate) fn release(&self) {
        let mut state = self.state.lock();
        if state.count == 0 {
            return;
        }
        state.count -= 1;

        if state.count == 0 {
            for id in state.installed.drain(..) {
                self.medium.remove_event_listener(id);
            }
            tracing::trace!("Removed native history handlers");
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.state.lock().count
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        for id in self.state.get_mut().installed.drain(..) {
            self.medium.remove_event_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::{NativeEvent, SimulatedMedium};

    fn subscription(medium: &Arc<SimulatedMedium>) -> EventSubscription {
        let handler: NativeEventHandler = Arc::new(|_: &NativeEvent| {});
        EventSubscription::new(
            Arc::clone(medium) as Arc<dyn NativeHistory>,
            vec![
                (NativeEventKind::PopState, Arc::clone(&handler)),
                (NativeEventKind::HashChange, handler),
            ],
        )
    }

    #[test]
    fn test_install_on_first_remove_on_last() {
        let medium = Arc::new(SimulatedMedium::new("http://localhost/").unwrap());
        let subscription = subscription(&medium);

        subscription.retain();
        assert_eq!(medium.handler_count(), 2);
        subscription.retain();
        assert_eq!(medium.handler_count(), 2);

        subscription.release();
        assert_eq!(medium.handler_count(), 2);
        subscription.release();
        assert_eq!(medium.handler_count(), 0);

        // Extra releases never underflow
        subscription.release();
        assert_eq!(subscription.count(), 0);
    }

    #[test]
    fn test_drop_removes_handlers() {
        let medium = Arc::new(SimulatedMedium::new("http://localhost/").unwrap());
        let subscription = subscription(&medium);
        subscription.retain();
        drop(subscription);
        assert_eq!(medium.handler_count(), 0);
    }
}
