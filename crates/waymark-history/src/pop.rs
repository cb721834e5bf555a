//! POP handling shared by the browser and hash backends
//!
//! An external navigation has already happened on the native medium by the
//! time we hear about it. If the transition is vetoed the medium is driven
//! back by the index delta, and the resulting second event is absorbed
//! through the forced-pop flag.

use std::sync::Arc;

use waymark_location::Location;

use crate::action::Action;
use crate::transition::{TransitionManager, UserConfirmation};

pub(crate) trait PopHandler: Send + Sync + 'static {
    fn transitions(&self) -> &TransitionManager;

    fn user_confirmation(&self) -> Option<UserConfirmation>;

    /// Clear the forced-pop flag, returning whether it was set.
    fn take_forced_pop(&self) -> bool;

    fn arm_forced_pop(&self);

    /// Make `location` current as a POP and notify.
    fn commit_pop(&self, location: Location);

    /// Notify listeners with the current, unchanged state.
    fn notify_unchanged(&self);

    /// `index(current) - index(pending)` in the backend's key index.
    fn revert_delta(&self, pending: &Location) -> isize;

    fn go(&self, delta: isize);
}

pub(crate) fn handle_pop<H: PopHandler>(handler: &Arc<H>, pending: Location) {
    if handler.take_forced_pop() {
        handler.notify_unchanged();
        return;
    }

    let target = Arc::clone(handler);
    let candidate = pending.clone();
    let confirmation = handler.user_confirmation();

    handler.transitions().confirm_transition_to(
        &pending,
        Action::Pop,
        confirmation.as_ref(),
        move |ok| {
            if ok {
                target.commit_pop(candidate);
            } else {
                revert_pop(target.as_ref(), &candidate);
            }
        },
    );
}

fn revert_pop<H: PopHandler>(handler: &H, from: &Location) {
    let delta = handler.revert_delta(from);

    if delta != 0 {
        tracing::debug!(delta, path = %from, "Reverting blocked POP");
        handler.arm_forced_pop();
        handler.go(delta);
    }
}
