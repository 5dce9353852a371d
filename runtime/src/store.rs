//! The root store and its dispatch loop.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use substore_core::action::{Action, BoxedAction, SharedAction};
use substore_core::effect::{EffectFn, EffectTable, Sequencing};
use substore_core::reducer::CombinedReducer;

use crate::error::StoreError;
use crate::subscription::{StateListener, Subscription};
use crate::substore::SubStore;

/// Sink for errors raised by concurrent effect handlers.
type ErrorSink = Box<dyn Fn(StoreError) + Send + Sync>;

/// Listener invoked once per dispatched action.
type DispatchListener = dyn Fn(&dyn Action) + Send + Sync;

/// The root store: owns the current state, the combined reducer, the
/// ordered effect tables, and the listener lists.
///
/// `Store` is a cheap-clone handle; clones share the same state and
/// listener lists. The state type must be `Clone` because every dispatch
/// publishes a snapshot to subscribers and hands clones to concurrent
/// effect tasks.
///
/// # Dispatch serialization
///
/// `dispatch` is serialized by an internal gate held for the full
/// reduce → publish → sequential-effects span, so no two dispatch cycles
/// interleave. Concurrent effects run on their own tokio tasks outside
/// the gate and re-acquire it only when they feed a follow-up action back
/// through `dispatch`. There is no bound on the number of in-flight
/// concurrent effect tasks; handlers that need one must apply it
/// themselves.
///
/// # Example
///
/// ```
/// use substore_core::reducer::ReducerSet;
/// use substore_runtime::Store;
/// # use substore_core::action::Action;
/// # #[derive(Debug)]
/// # struct Add(i64);
/// # impl Action for Add {
/// #     fn as_any(&self) -> &dyn std::any::Any { self }
/// #     fn name(&self) -> &'static str { std::any::type_name::<Self>() }
/// # }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let reducer = ReducerSet::new()
///     .on(|state: &mut i64, action: &Add| *state += action.0)
///     .into();
/// let store = Store::new(0, reducer);
///
/// store.dispatch(Add(40)).await.unwrap();
/// store.dispatch(Add(2)).await.unwrap();
/// assert_eq!(store.state(), 42);
/// # }
/// ```
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

struct StoreInner<S> {
    state: RwLock<S>,
    reducer: CombinedReducer<S>,
    effects: Vec<EffectTable<S>>,
    subscribers: Mutex<Vec<Arc<StateListener<S>>>>,
    dispatch_listeners: Mutex<Vec<Arc<DispatchListener>>>,
    gate: tokio::sync::Mutex<()>,
    error_sink: ErrorSink,
}

impl<S> Store<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a store with no effects.
    #[must_use]
    pub fn new(initial_state: S, reducer: CombinedReducer<S>) -> Self {
        Self::with_effects(initial_state, reducer, Vec::new())
    }

    /// Create a store with effect tables, in combination order.
    ///
    /// Concurrent-effect errors go to the default sink, which logs them
    /// at error level.
    #[must_use]
    pub fn with_effects(
        initial_state: S,
        reducer: CombinedReducer<S>,
        effects: Vec<EffectTable<S>>,
    ) -> Self {
        Self::with_error_sink(initial_state, reducer, effects, |error| {
            tracing::error!(error = %error, "concurrent effect failed");
        })
    }

    /// Create a store with a custom sink for concurrent-effect errors.
    #[must_use]
    pub fn with_error_sink(
        initial_state: S,
        reducer: CombinedReducer<S>,
        effects: Vec<EffectTable<S>>,
        error_sink: impl Fn(StoreError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial_state),
                reducer,
                effects,
                subscribers: Mutex::new(Vec::new()),
                dispatch_listeners: Mutex::new(Vec::new()),
                gate: tokio::sync::Mutex::new(()),
                error_sink: Box::new(error_sink),
            }),
        }
    }

    /// A clone of the current state. Never blocks on I/O.
    #[must_use]
    pub fn state(&self) -> S {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read the current state through a closure, without cloning.
    pub fn with_state<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Dispatch an action through the store.
    ///
    /// Runs one full reduce → publish → effects cycle. Sequential effects
    /// — and every action they cascade into — complete before this call
    /// returns; concurrent effects may complete after.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a reducer handler or a sequential
    /// effect handler fails. The state stays as of the last successful
    /// step; there is no rollback.
    #[tracing::instrument(skip(self, action), name = "store_dispatch")]
    pub async fn dispatch(&self, action: impl Action) -> Result<(), StoreError> {
        self.dispatch_shared(Arc::new(action)).await
    }

    /// Dispatch an already type-erased action.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn dispatch_boxed(&self, action: BoxedAction) -> Result<(), StoreError> {
        self.dispatch_shared(Arc::from(action)).await
    }

    pub(crate) async fn dispatch_shared(&self, action: SharedAction) -> Result<(), StoreError> {
        let _gate = self.inner.gate.lock().await;
        self.dispatch_cycle(&action)
    }

    /// Register a change-listener.
    ///
    /// The listener is synchronously replayed the current state, then
    /// receives every published state in dispatch order. Returns the
    /// [`Subscription`] that stops the notifications.
    pub fn subscribe(&self, listener: impl Fn(&S) + Send + Sync + 'static) -> Subscription {
        let (entry, subscription) = StateListener::new(Box::new(listener));
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&entry));

        let snapshot = self.state();
        entry.deliver(&snapshot);
        subscription
    }

    /// Derive a read-only sub-store view of a projection of this state.
    pub fn select<Sub>(
        &self,
        projection: impl Fn(&S) -> Sub + Send + Sync + 'static,
    ) -> SubStore<S, Sub>
    where
        Sub: Clone + PartialEq + Send + Sync + 'static,
    {
        SubStore::new(self.clone(), Arc::new(projection))
    }

    /// Register a listener invoked once per dispatched action — top-level
    /// and effect-triggered alike, in the order they were dispatched.
    pub fn on_every_dispatch(&self, listener: impl Fn(&dyn Action) + Send + Sync + 'static) {
        self.inner
            .dispatch_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// One full dispatch cycle. Runs under the gate; recursion handles
    /// the actions sequential effects cascade into.
    fn dispatch_cycle(&self, action: &SharedAction) -> Result<(), StoreError> {
        tracing::debug!(action = action.name(), "dispatching");
        metrics::counter!("store.dispatch.total").increment(1);

        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let start = std::time::Instant::now();
            self.inner
                .reducer
                .reduce(&mut state, action.as_ref())
                .map_err(|source| StoreError::Reducer {
                    action: action.name(),
                    source,
                })?;
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());
        }

        // Published unconditionally, even when the value is unchanged, so
        // sub-stores watching an unrelated projection still see the tick.
        let snapshot = self.state();
        self.publish(&snapshot);
        self.notify_dispatch_listeners(action.as_ref());

        // Every sequential effect of this action sees the same snapshot,
        // the state as finalized by this action's reducer step, even when
        // a cascaded dispatch has already moved the store on.
        for table in self.sequential_tables() {
            for handler in table.handlers_for(action.as_ref()) {
                metrics::counter!("store.effects.executed", "kind" => "sequential").increment(1);
                let follow_up =
                    handler(&snapshot, action.as_ref()).map_err(|source| StoreError::Effect {
                        action: action.name(),
                        source,
                    })?;
                if let Some(next) = follow_up {
                    tracing::trace!(
                        from = action.name(),
                        to = next.name(),
                        "sequential effect cascades"
                    );
                    self.dispatch_cycle(&Arc::from(next))?;
                }
            }
        }

        for table in self.concurrent_tables() {
            for handler in table.handlers_for(action.as_ref()) {
                metrics::counter!("store.effects.executed", "kind" => "concurrent").increment(1);
                self.spawn_concurrent(Arc::clone(handler), snapshot.clone(), Arc::clone(action));
            }
        }

        Ok(())
    }

    /// Run one concurrent effect handler on its own task.
    ///
    /// The task owns a clone of the post-reduce snapshot and a shared
    /// handle on the action. Its follow-up re-enters `dispatch` (waiting
    /// on the gate like any other caller); its errors go to the error
    /// sink. A panicking handler takes down only its own task.
    fn spawn_concurrent(&self, handler: EffectFn<S>, state: S, action: SharedAction) {
        let store = self.clone();
        tokio::spawn(async move {
            match handler(&state, action.as_ref()) {
                Ok(Some(next)) => {
                    if let Err(error) = store.dispatch_shared(Arc::from(next)).await {
                        store.report(error);
                    }
                },
                Ok(None) => {
                    tracing::trace!(action = action.name(), "concurrent effect produced nothing");
                },
                Err(source) => {
                    store.report(StoreError::Effect {
                        action: action.name(),
                        source,
                    });
                },
            }
        });
    }

    fn sequential_tables(&self) -> impl Iterator<Item = &EffectTable<S>> {
        self.inner
            .effects
            .iter()
            .filter(|table| table.sequencing() == Sequencing::Sequential)
    }

    fn concurrent_tables(&self) -> impl Iterator<Item = &EffectTable<S>> {
        self.inner
            .effects
            .iter()
            .filter(|table| table.sequencing() == Sequencing::Concurrent)
    }

    /// Publish a state to every active subscriber.
    ///
    /// Iterates a snapshot of the list so callbacks may subscribe or
    /// dispose without touching the list being walked; disposed entries
    /// are swept here, under the dispatch gate.
    fn publish(&self, state: &S) {
        let listeners: Vec<Arc<StateListener<S>>> = {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|entry| entry.is_active());
            subscribers.clone()
        };

        for entry in &listeners {
            entry.deliver(state);
        }
    }

    fn notify_dispatch_listeners(&self, action: &dyn Action) {
        let listeners: Vec<Arc<DispatchListener>> = self
            .inner
            .dispatch_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in &listeners {
            listener(action);
        }
    }

    pub(crate) fn report(&self, error: StoreError) {
        (self.inner.error_sink)(error);
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field(
                "subscribers",
                &self
                    .inner
                    .subscribers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len(),
            )
            .field("effect_tables", &self.inner.effects.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use substore_core::combine_effects;
    use substore_core::effect::{EffectSet, Effects};
    use substore_core::reducer::{ReducerSet, Reducers, combine_reducers};
    use substore_macros::Action;
    use substore_testing::{ActionProbe, StateProbe};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        value: i64,
    }

    #[derive(Debug, Action)]
    struct Inc;

    #[derive(Debug, Action)]
    struct Set(i64);

    #[derive(Debug, Action)]
    struct Trigger;

    #[derive(Debug, Action)]
    struct Unhandled;

    struct CounterReducers;

    impl Reducers<Counter> for CounterReducers {
        fn reducers(&self) -> ReducerSet<Counter> {
            ReducerSet::new()
                .on(|state: &mut Counter, _: &Inc| state.value += 1)
                .on(|state: &mut Counter, action: &Set| state.value = action.0)
        }
    }

    struct AddOne;

    impl Reducers<Counter> for AddOne {
        fn reducers(&self) -> ReducerSet<Counter> {
            ReducerSet::new().on(|state: &mut Counter, _: &Inc| state.value += 1)
        }
    }

    struct Double;

    impl Reducers<Counter> for Double {
        fn reducers(&self) -> ReducerSet<Counter> {
            ReducerSet::new().on(|state: &mut Counter, _: &Inc| state.value *= 2)
        }
    }

    /// Sequential: maps `Trigger` into `Set(10)`.
    struct TriggerToSet;

    impl Effects<Counter> for TriggerToSet {
        fn sequencing(&self) -> Sequencing {
            Sequencing::Sequential
        }

        fn effects(&self) -> EffectSet<Counter> {
            EffectSet::new().on(|_: &Counter, _: &Trigger| Some(Box::new(Set(10))))
        }
    }

    /// Sequential: observes `Trigger`, produces nothing.
    struct TriggerObserver;

    impl Effects<Counter> for TriggerObserver {
        fn sequencing(&self) -> Sequencing {
            Sequencing::Sequential
        }

        fn effects(&self) -> EffectSet<Counter> {
            EffectSet::new().on(|_: &Counter, _: &Trigger| None)
        }
    }

    /// Concurrent: maps `Trigger` into `Inc`.
    struct TriggerToIncConcurrent;

    impl Effects<Counter> for TriggerToIncConcurrent {
        fn effects(&self) -> EffectSet<Counter> {
            EffectSet::new().on(|_: &Counter, _: &Trigger| Some(Box::new(Inc)))
        }
    }

    /// Concurrent: always fails.
    struct FailingConcurrent;

    impl Effects<Counter> for FailingConcurrent {
        fn effects(&self) -> EffectSet<Counter> {
            EffectSet::new()
                .try_on(|_: &Counter, _: &Trigger| Err(anyhow::anyhow!("effect exploded")))
        }
    }

    fn counter_store() -> Store<Counter> {
        Store::new(Counter { value: 0 }, combine_reducers(&[&CounterReducers]))
    }

    #[tokio::test]
    async fn store_exposes_current_state() {
        let store = counter_store();
        assert_eq!(store.state().value, 0);
        assert_eq!(store.with_state(|s| s.value), 0);
    }

    #[tokio::test]
    async fn dispatch_runs_the_reducer() {
        let store = counter_store();
        store.dispatch(Inc).await.unwrap();
        store.dispatch_boxed(Box::new(Set(5))).await.unwrap();
        assert_eq!(store.state().value, 5);
    }

    #[tokio::test]
    async fn unhandled_action_leaves_state_unchanged() {
        let store = counter_store();
        store.dispatch(Unhandled).await.unwrap();
        assert_eq!(store.state().value, 0);
    }

    #[tokio::test]
    async fn subscriber_gets_initial_replay_then_one_publication_per_dispatch() {
        let store = counter_store();
        let probe = StateProbe::new();
        let _subscription = store.subscribe(probe.listener());

        store.dispatch(Inc).await.unwrap();
        store.dispatch(Inc).await.unwrap();
        store.dispatch(Set(7)).await.unwrap();

        let values: Vec<i64> = probe.values().into_iter().map(|s: Counter| s.value).collect();
        assert_eq!(values, vec![0, 1, 2, 7]);
    }

    #[tokio::test]
    async fn publication_is_unconditional_even_for_identical_state() {
        let store = counter_store();
        let probe = StateProbe::new();
        let _subscription = store.subscribe(probe.listener());

        // No reducer handles this; the state value does not change, but
        // the tick is still published.
        store.dispatch(Unhandled).await.unwrap();

        assert_eq!(probe.len(), 2);
    }

    #[tokio::test]
    async fn every_dispatch_listener_fires_once_per_action() {
        let store = counter_store();
        let probe = ActionProbe::new();
        store.on_every_dispatch(probe.listener());

        store.dispatch(Inc).await.unwrap();
        store.dispatch(Unhandled).await.unwrap();

        assert_eq!(probe.len(), 2);
    }

    #[tokio::test]
    async fn sequential_effect_cascades_before_dispatch_returns() {
        let store = Store::with_effects(
            Counter { value: 0 },
            combine_reducers(&[&CounterReducers]),
            combine_effects(&[&TriggerToSet]),
        );
        let actions = ActionProbe::new();
        store.on_every_dispatch(actions.listener());

        store.dispatch(Trigger).await.unwrap();

        // The cascade completed inside dispatch: state already reflects Set.
        assert_eq!(store.state().value, 10);
        let names = actions.names();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("Trigger"));
        assert!(names[1].ends_with("Set"));
    }

    #[tokio::test]
    async fn effect_returning_none_never_causes_a_dispatch() {
        let store = Store::with_effects(
            Counter { value: 0 },
            combine_reducers(&[&CounterReducers]),
            combine_effects(&[&TriggerObserver]),
        );
        let actions = ActionProbe::new();
        store.on_every_dispatch(actions.listener());

        store.dispatch(Trigger).await.unwrap();

        assert_eq!(actions.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_effect_feeds_its_action_back() {
        let store = Store::with_effects(
            Counter { value: 0 },
            combine_reducers(&[&CounterReducers]),
            combine_effects(&[&TriggerToIncConcurrent]),
        );

        store.dispatch(Trigger).await.unwrap();

        // The follow-up arrives on its own task, after dispatch returned.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.state().value, 1);
    }

    #[tokio::test]
    async fn concurrent_effect_failure_goes_to_the_sink_not_the_caller() {
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&failures);
        let store = Store::with_error_sink(
            Counter { value: 0 },
            combine_reducers(&[&CounterReducers]),
            combine_effects(&[&FailingConcurrent]),
            move |_error| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        );

        store.dispatch(Trigger).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(failures.load(Ordering::SeqCst), 1);

        // The store is still operational.
        store.dispatch(Inc).await.unwrap();
        assert_eq!(store.state().value, 1);
    }

    #[tokio::test]
    async fn reducer_failure_propagates_and_keeps_earlier_mutations() {
        let set = ReducerSet::new()
            .on(|state: &mut Counter, _: &Inc| state.value += 1)
            .try_on(|_: &mut Counter, _: &Inc| Err(anyhow::anyhow!("reducer exploded")));
        let store = Store::new(Counter { value: 0 }, set.into());
        let probe = StateProbe::<Counter>::new();
        let _subscription = store.subscribe(probe.listener());

        let error = store.dispatch(Inc).await.unwrap_err();
        assert!(matches!(error, StoreError::Reducer { .. }));

        // The chain stopped at the failing handler; the first handler's
        // mutation stands, but nothing was published for this dispatch.
        assert_eq!(store.state().value, 1);
        assert_eq!(probe.len(), 1);
    }

    #[tokio::test]
    async fn sequential_effect_failure_propagates_to_the_caller() {
        struct FailingSequential;

        impl Effects<Counter> for FailingSequential {
            fn sequencing(&self) -> Sequencing {
                Sequencing::Sequential
            }

            fn effects(&self) -> EffectSet<Counter> {
                EffectSet::new()
                    .try_on(|_: &Counter, _: &Trigger| Err(anyhow::anyhow!("effect exploded")))
            }
        }

        let store = Store::with_effects(
            Counter { value: 0 },
            combine_reducers(&[&CounterReducers]),
            combine_effects(&[&FailingSequential]),
        );

        let error = store.dispatch(Trigger).await.unwrap_err();
        assert!(matches!(error, StoreError::Effect { .. }));
        assert!(error.action().ends_with("Trigger"));
    }

    #[tokio::test]
    async fn combining_two_objects_folds_in_object_order() {
        // (3 + 1) * 2 = 8
        let store = Store::new(Counter { value: 3 }, combine_reducers(&[&AddOne, &Double]));
        store.dispatch(Inc).await.unwrap();
        assert_eq!(store.state().value, 8);
    }

    #[tokio::test]
    async fn disposing_inside_a_notification_is_safe() {
        let store = counter_store();
        let count = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&count);
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_in_callback = Arc::clone(&slot);
        let subscription = store.subscribe(move |_: &Counter| {
            seen.fetch_add(1, Ordering::SeqCst);
            if let Some(subscription) = slot_in_callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                subscription.dispose();
            }
        });
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(subscription);

        // Initial replay ran before the handle was stored; this dispatch
        // delivers once more and disposes from inside the callback.
        store.dispatch(Inc).await.unwrap();
        store.dispatch(Inc).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscribing_inside_a_notification_does_not_deadlock() {
        let store = counter_store();
        let late_probe = StateProbe::<Counter>::new();

        let inner_store = store.clone();
        let late_listener = late_probe.listener();
        let armed = Arc::new(AtomicUsize::new(0));
        let armed_flag = Arc::clone(&armed);
        let _subscription = store.subscribe(move |_: &Counter| {
            if armed_flag.fetch_add(1, Ordering::SeqCst) == 1 {
                // Register a second subscriber from inside a callback.
                let _late = inner_store.subscribe(late_listener.clone());
            }
        });

        store.dispatch(Inc).await.unwrap();
        store.dispatch(Inc).await.unwrap();

        // The late subscriber got its replay plus the second dispatch.
        assert_eq!(late_probe.len(), 2);
    }
}
