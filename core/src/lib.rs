//! # Substore Core
//!
//! Core abstractions for the Substore state container: actions, handler
//! sets, and the combination algebra that merges independently-authored
//! handler objects into a single dispatch table per kind.
//!
//! ## Core Concepts
//!
//! - **Action**: an opaque, type-tagged value describing an intent
//! - **Reducer handler**: pure transformation `(&mut State, &ConcreteAction)`
//! - **Effect handler**: `(&State, &ConcreteAction) → Option<BoxedAction>`,
//!   where `None` means "no follow-up action"
//! - **Handler-bearing object**: any value implementing [`Reducers`] or
//!   [`Effects`], contributing an ordered set of handlers
//! - **Combination**: [`combine_reducers`] / [`combine_effects`] merge many
//!   objects into one table keyed by the concrete action type
//!
//! Actions are identified by their concrete type, never by structural
//! equality. An action with no registered handler is a no-op: reducers
//! return the state unchanged and effects produce no follow-up.
//!
//! ## Example
//!
//! ```
//! use substore_core::action::Action;
//! use substore_core::reducer::{ReducerSet, Reducers, combine_reducers};
//!
//! #[derive(Debug)]
//! struct Add(i64);
//!
//! impl Action for Add {
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         std::any::type_name::<Self>()
//!     }
//! }
//!
//! struct CounterReducers;
//!
//! impl Reducers<i64> for CounterReducers {
//!     fn reducers(&self) -> ReducerSet<i64> {
//!         ReducerSet::new().on(|state: &mut i64, action: &Add| *state += action.0)
//!     }
//! }
//!
//! let reducer = combine_reducers(&[&CounterReducers]);
//! let mut state = 40;
//! reducer.reduce(&mut state, &Add(2)).unwrap();
//! assert_eq!(state, 42);
//! ```

/// Action types and the open action trait
pub mod action;

/// Effect handler sets and their combination into dispatch tables
pub mod effect;

/// Reducer handler sets and their combination into dispatch tables
pub mod reducer;

pub use action::{Action, BoxedAction, SharedAction};
pub use effect::{EffectSet, EffectTable, Effects, Sequencing, combine_effects};
pub use reducer::{CombinedReducer, ReducerSet, Reducers, combine_reducers};
