//! Subscription handles and listener bookkeeping.
//!
//! The notification pipeline is an explicit listener list plus the last
//! published value held by the store: a new subscriber is replayed the
//! current state synchronously at subscribe time, then receives every
//! published value in dispatch order.
//!
//! Disposal is deferred: [`Subscription::dispose`] flips an atomic flag,
//! deliveries check it, and the store sweeps flagged entries out of the
//! list on the next publish. That makes disposing from inside a
//! notification callback safe — the list being iterated is a snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle representing one registered change-listener.
///
/// Disposing stops further notifications for that listener only; other
/// subscribers and the store's state are unaffected. Dropping the handle
/// without calling [`dispose`](Self::dispose) leaves the subscription
/// active for the lifetime of the store.
#[derive(Debug)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Stop further notifications for this listener.
    ///
    /// Safe to call from within a notification callback; the listener
    /// entry is removed from the store's list on the next publish.
    pub fn dispose(self) {
        self.active.store(false, Ordering::Release);
    }

    /// Whether the listener is still receiving notifications.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// One entry in a store's subscriber list.
pub(crate) struct StateListener<S> {
    active: Arc<AtomicBool>,
    callback: Box<dyn Fn(&S) + Send + Sync>,
}

impl<S> StateListener<S> {
    pub(crate) fn new(callback: Box<dyn Fn(&S) + Send + Sync>) -> (Arc<Self>, Subscription) {
        let active = Arc::new(AtomicBool::new(true));
        let entry = Arc::new(Self {
            active: Arc::clone(&active),
            callback,
        });
        (entry, Subscription { active })
    }

    /// Deliver `state` unless the subscription was disposed.
    pub(crate) fn deliver(&self, state: &S) {
        if self.is_active() {
            (self.callback)(state);
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_stops_delivery() {
        let delivered = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&delivered);
        let (entry, subscription) =
            StateListener::new(Box::new(move |_: &u32| seen.store(true, Ordering::SeqCst)));

        assert!(subscription.is_active());
        subscription.dispose();
        assert!(!entry.is_active());

        entry.deliver(&1);
        assert!(!delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn active_entry_delivers() {
        let delivered = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&delivered);
        let (entry, _subscription) =
            StateListener::new(Box::new(move |_: &u32| seen.store(true, Ordering::SeqCst)));

        entry.deliver(&1);
        assert!(delivered.load(Ordering::SeqCst));
    }
}
