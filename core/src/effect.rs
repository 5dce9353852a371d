//! Effect handler sets and their combination.
//!
//! An effect handler observes the state finalized by the reducer step and
//! may answer with a follow-up action to dispatch; `None` means there is
//! nothing further to do. Effects never mutate state.
//!
//! Whether an object's effects run inline with the dispatch (sequential)
//! or on their own tasks (concurrent) is a property of the contributing
//! object, not of individual handlers — see [`Sequencing`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::action::{Action, BoxedAction};

/// A type-erased effect handler stored in the dispatch table.
///
/// Shared (`Arc`) so the runtime can hand one handler to an independently
/// scheduled task without re-registering it.
pub type EffectFn<S> =
    Arc<dyn Fn(&S, &dyn Action) -> Result<Option<BoxedAction>, anyhow::Error> + Send + Sync>;

/// Execution class for all effects contributed by one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequencing {
    /// Run inline with the dispatch; follow-up actions are dispatched
    /// immediately, before the next sequential handler, and complete
    /// before the triggering `dispatch` call returns.
    Sequential,

    /// Run on an independent unit of concurrency; follow-up actions are
    /// dispatched when the handler completes, possibly after the
    /// triggering `dispatch` call has already returned.
    Concurrent,
}

/// An ordered set of effect handlers contributed by one object.
///
/// # Example
///
/// ```
/// use substore_core::effect::EffectSet;
/// # use substore_core::action::{Action, BoxedAction};
/// # #[derive(Debug)]
/// # struct Saved;
/// # impl Action for Saved {
/// #     fn as_any(&self) -> &dyn std::any::Any { self }
/// #     fn name(&self) -> &'static str { std::any::type_name::<Self>() }
/// # }
///
/// let set = EffectSet::new().on(|_state: &u32, _action: &Saved| None);
/// assert_eq!(set.len(), 1);
/// ```
pub struct EffectSet<S> {
    entries: Vec<(TypeId, EffectFn<S>)>,
}

impl<S> EffectSet<S> {
    /// Create an empty handler set.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register an infallible handler for the concrete action type `A`.
    ///
    /// The handler returns the follow-up action to dispatch, or `None`
    /// when nothing further should happen.
    #[must_use]
    pub fn on<A, F>(mut self, handler: F) -> Self
    where
        A: Action,
        F: Fn(&S, &A) -> Option<BoxedAction> + Send + Sync + 'static,
    {
        self.entries.push((
            TypeId::of::<A>(),
            Arc::new(move |state, action| {
                Ok(action
                    .downcast_ref::<A>()
                    .and_then(|concrete| handler(state, concrete)))
            }),
        ));
        self
    }

    /// Register a fallible handler for the concrete action type `A`.
    ///
    /// How an error surfaces depends on the object's [`Sequencing`]: a
    /// sequential effect's error propagates out of the triggering
    /// `dispatch`; a concurrent effect's error goes to the store's error
    /// sink and is otherwise treated as `None`.
    #[must_use]
    pub fn try_on<A, F>(mut self, handler: F) -> Self
    where
        A: Action,
        F: Fn(&S, &A) -> Result<Option<BoxedAction>, anyhow::Error> + Send + Sync + 'static,
    {
        self.entries.push((
            TypeId::of::<A>(),
            Arc::new(move |state, action| match action.downcast_ref::<A>() {
                Some(concrete) => handler(state, concrete),
                None => Ok(None),
            }),
        ));
        self
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_entries(self) -> Vec<(TypeId, EffectFn<S>)> {
        self.entries
    }
}

impl<S> Default for EffectSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The contract for an effect-bearing object.
pub trait Effects<S> {
    /// Execution class for every handler this object contributes.
    fn sequencing(&self) -> Sequencing {
        Sequencing::Concurrent
    }

    /// The handlers this object contributes, in declaration order.
    fn effects(&self) -> EffectSet<S>;
}

/// One contributing object's effect dispatch table, tagged with its
/// execution class.
///
/// The store keeps these in combination order; within one action tag,
/// handlers keep their declaration order.
pub struct EffectTable<S> {
    sequencing: Sequencing,
    table: HashMap<TypeId, SmallVec<[EffectFn<S>; 2]>>,
}

impl<S> EffectTable<S> {
    /// The execution class of every handler in this table.
    #[must_use]
    pub const fn sequencing(&self) -> Sequencing {
        self.sequencing
    }

    /// The handlers registered for the action's concrete type, in
    /// declaration order. An unmatched action yields no handlers, which
    /// the store treats as "no follow-up action".
    #[must_use]
    pub fn handlers_for(&self, action: &dyn Action) -> &[EffectFn<S>] {
        self.table
            .get(&action.as_any().type_id())
            .map_or(&[], SmallVec::as_slice)
    }

    fn from_set(sequencing: Sequencing, set: EffectSet<S>) -> Self {
        let mut table: HashMap<TypeId, SmallVec<[EffectFn<S>; 2]>> = HashMap::new();
        for (tag, handler) in set.into_entries() {
            table.entry(tag).or_default().push(handler);
        }
        Self { sequencing, table }
    }
}

impl<S> From<EffectSet<S>> for EffectTable<S> {
    /// A single handler set used directly; defaults to concurrent, like an
    /// untagged object.
    fn from(set: EffectSet<S>) -> Self {
        Self::from_set(Sequencing::Concurrent, set)
    }
}

/// Build one [`EffectTable`] per contributing object, in slice order.
///
/// The per-object tables are kept separate (rather than merged into one
/// map) because the execution class is decided per object and the store
/// partitions on it at dispatch time.
#[must_use]
pub fn combine_effects<S>(objects: &[&dyn Effects<S>]) -> Vec<EffectTable<S>> {
    objects
        .iter()
        .map(|object| EffectTable::from_set(object.sequencing(), object.effects()))
        .collect()
}
