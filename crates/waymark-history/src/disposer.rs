//! Idempotent unsubscribe handles

use parking_lot::Mutex;

type Dispose = Box<dyn FnOnce() + Send>;

/// Returned by `listen` and `block`.
///
/// `dispose` runs its teardown at most once; later calls are no-ops.
/// Dropping a `Disposer` without calling `dispose` leaves the
/// registration in place.
#[must_use = "dropping a Disposer keeps the registration active; call `dispose` to remove it"]
pub struct Disposer {
    teardown: Mutex<Option<Dispose>>,
}

impl Disposer {
    pub(crate) fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    pub fn dispose(&self) {
        // Taken out first so the teardown runs without the lock held
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.teardown.lock().is_none()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
