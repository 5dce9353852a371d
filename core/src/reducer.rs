//! Reducer handler sets and their combination.
//!
//! A reducer handler is a pure transformation of the state for one
//! concrete action type. Handler-bearing objects register their handlers
//! explicitly on a [`ReducerSet`]; [`combine_reducers`] merges any number
//! of such objects into one [`CombinedReducer`] keyed by the concrete
//! action type.

use std::any::TypeId;
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::action::Action;

/// A type-erased reducer handler stored in the dispatch table.
///
/// Handlers mutate the state in place; a chain of handlers for one action
/// tag runs left-to-right, each seeing the cumulative state produced by
/// the previous one. An error stops the chain at the failing handler and
/// keeps the mutations made so far.
pub type ReducerFn<S> = Box<dyn Fn(&mut S, &dyn Action) -> Result<(), anyhow::Error> + Send + Sync>;

/// An ordered set of reducer handlers contributed by one object.
///
/// Registration order is preserved: within one action tag, handlers run in
/// the order they were added here, and across objects in the order the
/// objects were passed to [`combine_reducers`]. That order is
/// deterministic and stable across runs.
///
/// # Example
///
/// ```
/// use substore_core::reducer::ReducerSet;
/// # use substore_core::action::Action;
/// # #[derive(Debug)]
/// # struct Add(i64);
/// # impl Action for Add {
/// #     fn as_any(&self) -> &dyn std::any::Any { self }
/// #     fn name(&self) -> &'static str { std::any::type_name::<Self>() }
/// # }
///
/// let set = ReducerSet::new()
///     .on(|state: &mut i64, action: &Add| *state += action.0);
/// assert_eq!(set.len(), 1);
/// ```
pub struct ReducerSet<S> {
    entries: Vec<(TypeId, ReducerFn<S>)>,
}

impl<S> ReducerSet<S> {
    /// Create an empty handler set.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register an infallible handler for the concrete action type `A`.
    #[must_use]
    pub fn on<A, F>(mut self, handler: F) -> Self
    where
        A: Action,
        F: Fn(&mut S, &A) + Send + Sync + 'static,
    {
        self.entries.push((
            TypeId::of::<A>(),
            Box::new(move |state, action| {
                if let Some(concrete) = action.downcast_ref::<A>() {
                    handler(state, concrete);
                }
                Ok(())
            }),
        ));
        self
    }

    /// Register a fallible handler for the concrete action type `A`.
    ///
    /// A returned error propagates out of the dispatch that triggered it;
    /// the state keeps the mutations of the handlers that ran before.
    #[must_use]
    pub fn try_on<A, F>(mut self, handler: F) -> Self
    where
        A: Action,
        F: Fn(&mut S, &A) -> Result<(), anyhow::Error> + Send + Sync + 'static,
    {
        self.entries.push((
            TypeId::of::<A>(),
            Box::new(move |state, action| match action.downcast_ref::<A>() {
                Some(concrete) => handler(state, concrete),
                None => Ok(()),
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

    fn into_entries(self) -> Vec<(TypeId, ReducerFn<S>)> {
        self.entries
    }
}

impl<S> Default for ReducerSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The contract for a reducer-bearing object.
///
/// An implementor enumerates its handlers as a [`ReducerSet`]; the store
/// never introspects the object beyond this method.
pub trait Reducers<S> {
    /// The handlers this object contributes, in declaration order.
    fn reducers(&self) -> ReducerSet<S>;
}

/// The combined reducer dispatch table for a store.
///
/// Built once at store-construction time by [`combine_reducers`]. Lookup
/// is by the action's concrete type; an unmatched action is a no-op and
/// leaves the state untouched.
pub struct CombinedReducer<S> {
    table: HashMap<TypeId, SmallVec<[ReducerFn<S>; 2]>>,
}

impl<S> CombinedReducer<S> {
    /// Reduce `state` in place by `action`.
    ///
    /// Runs the action's handler chain left-to-right, each handler seeing
    /// the state produced by the previous one.
    ///
    /// # Errors
    ///
    /// Returns the first handler error. The chain stops there; mutations
    /// from earlier handlers in the chain are kept.
    pub fn reduce(&self, state: &mut S, action: &dyn Action) -> Result<(), anyhow::Error> {
        let Some(handlers) = self.table.get(&action.as_any().type_id()) else {
            return Ok(());
        };

        for handler in handlers {
            handler(state, action)?;
        }
        Ok(())
    }

    /// Whether any handler is registered for the action's concrete type.
    #[must_use]
    pub fn handles(&self, action: &dyn Action) -> bool {
        self.table.contains_key(&action.as_any().type_id())
    }

    fn from_sets(sets: impl IntoIterator<Item = ReducerSet<S>>) -> Self {
        let mut table: HashMap<TypeId, SmallVec<[ReducerFn<S>; 2]>> = HashMap::new();
        for set in sets {
            for (tag, handler) in set.into_entries() {
                table.entry(tag).or_default().push(handler);
            }
        }
        Self { table }
    }
}

impl<S> From<ReducerSet<S>> for CombinedReducer<S> {
    /// A single handler set used directly, without a bearing object.
    fn from(set: ReducerSet<S>) -> Self {
        Self::from_sets([set])
    }
}

/// Merge the handler sets of many reducer-bearing objects into one
/// dispatch table.
///
/// Objects are consulted in slice order; within each object, handlers keep
/// their declaration order. Two objects may both handle the same action
/// type — both run, in combination order, each seeing the cumulative state
/// produced by the previous handler.
#[must_use]
pub fn combine_reducers<S>(objects: &[&dyn Reducers<S>]) -> CombinedReducer<S> {
    CombinedReducer::from_sets(objects.iter().map(|object| object.reducers()))
}
