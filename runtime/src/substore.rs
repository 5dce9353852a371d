//! Derived sub-store views.
//!
//! A [`SubStore`] is a read-only projection of a root [`Store`]. It holds
//! no state of its own — reading it recomputes the projection from the
//! root's live state — and it forwards `dispatch` and every-dispatch
//! registration to the root verbatim. Its one behavioral addition is the
//! distinct-change filter on notifications: subscribers only hear about
//! projected values that differ from the previous emission.

use std::sync::{Arc, Mutex, PoisonError};

use substore_core::action::Action;

use crate::error::StoreError;
use crate::store::Store;
use crate::subscription::Subscription;

/// Composed projection from the root state to this view's sub-state.
type Projection<S, Sub> = Arc<dyn Fn(&S) -> Sub + Send + Sync>;

/// A read-only derived view of a store through a pure projection.
///
/// Chaining [`select`](Self::select) composes the projections against the
/// root: an arbitrarily deep chain behaves identically, for subscription
/// purposes, to a single `select` with the composed function. No
/// intermediate view ever caches a projected value.
///
/// The sub-state type must be `PartialEq` for the distinct filter and
/// `Clone` because the previous emission is retained for comparison.
/// Projections of `Option<T>` compare `None == None` as equal, so an
/// absent value does not re-notify.
pub struct SubStore<S, Sub> {
    root: Store<S>,
    project: Projection<S, Sub>,
}

impl<S, Sub> SubStore<S, Sub>
where
    S: Clone + Send + Sync + 'static,
    Sub: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(root: Store<S>, project: Projection<S, Sub>) -> Self {
        Self { root, project }
    }

    /// The projected value of the root's current state, computed on
    /// demand. Never cached across root updates.
    #[must_use]
    pub fn state(&self) -> Sub {
        self.root.with_state(|state| (self.project)(state))
    }

    /// Forward an action to the root store.
    ///
    /// # Errors
    ///
    /// Same as [`Store::dispatch`].
    pub async fn dispatch(&self, action: impl Action) -> Result<(), StoreError> {
        self.root.dispatch(action).await
    }

    /// Register a change-listener on the projected value.
    ///
    /// The listener receives the current projection synchronously at
    /// subscribe time, then only those subsequent projections that differ
    /// from the previous emission. The tick itself comes from the root,
    /// which publishes unconditionally; the filter here is what keeps an
    /// unrelated dispatch quiet.
    pub fn subscribe(&self, listener: impl Fn(&Sub) + Send + Sync + 'static) -> Subscription {
        let project = Arc::clone(&self.project);
        let previous: Mutex<Option<Sub>> = Mutex::new(None);

        self.root.subscribe(move |state: &S| {
            let current = project(state);
            let mut guard = previous.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.as_ref() == Some(&current) {
                return;
            }
            *guard = Some(current.clone());
            // Released before the callback so the listener may subscribe
            // or dispose reentrantly.
            drop(guard);
            listener(&current);
        })
    }

    /// Derive a further view by composing a projection onto this one.
    ///
    /// The composition is applied to the root's live state on every read
    /// and notification — never to a stale intermediate value.
    pub fn select<Sub2>(
        &self,
        projection: impl Fn(&Sub) -> Sub2 + Send + Sync + 'static,
    ) -> SubStore<S, Sub2>
    where
        Sub2: Clone + PartialEq + Send + Sync + 'static,
    {
        let project = Arc::clone(&self.project);
        SubStore::new(
            self.root.clone(),
            Arc::new(move |state: &S| projection(&project(state))),
        )
    }

    /// Forward an every-dispatch listener registration to the root store.
    pub fn on_every_dispatch(&self, listener: impl Fn(&dyn Action) + Send + Sync + 'static) {
        self.root.on_every_dispatch(listener);
    }
}

impl<S, Sub> Clone for SubStore<S, Sub> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            project: Arc::clone(&self.project),
        }
    }
}

impl<S, Sub> std::fmt::Debug for SubStore<S, Sub> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubStore").finish_non_exhaustive()
    }
}
