//! Single-slot de-duplication of concurrent async work.
//!
//! A call either attaches to the pending operation or installs a new one under the same
//! lock, so at most one operation runs at a time and every caller that arrived while it
//! was pending observes its outcome. The operation empties the slot itself as it finishes,
//! so a call arriving after that always starts fresh work.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::{
    future::Future,
    sync::{Arc, Weak},
};

type Pending<T> = Shared<BoxFuture<'static, T>>;

pub struct SingleFlight<T: Clone> {
    slot: Arc<Mutex<Option<Pending<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { slot: Arc::new(Mutex::new(None)) }
    }

    /// Runs the future built by `make`, or joins the one already in flight.
    ///
    /// `make` is only called when nothing is pending, and it is called while the slot lock is
    /// held: it must not block and must not call back into this `SingleFlight`.
    pub async fn run<F, Fut>(&self, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let pending = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let pending = clear_on_finish(make(), Arc::downgrade(&self.slot));
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Whether an operation is currently pending.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// Wraps `work` so that it empties `slot` before its outcome becomes visible to waiters.
///
/// The slot is held weakly: the stored future must not keep its own slot alive.
fn clear_on_finish<T, Fut>(work: Fut, slot: Weak<Mutex<Option<Pending<T>>>>) -> Pending<T>
where
    T: Clone + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    async move {
        let outcome = work.await;
        if let Some(slot) = slot.upgrade() {
            *slot.lock() = None;
        }
        outcome
    }
    .boxed()
    .shared()
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
