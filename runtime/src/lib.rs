//! # Substore Runtime
//!
//! The store runtime for the Substore state container.
//!
//! This crate provides the [`Store`] that owns the root state and runs the
//! dispatch loop, the [`SubStore`] projection views with change-filtered
//! notifications, and the [`Subscription`] handles that tie observers to
//! either.
//!
//! ## Dispatch cycle
//!
//! One `dispatch` call runs the full cycle, serialized against other
//! dispatches:
//!
//! 1. The combined reducer transforms the state in place.
//! 2. The new state is published to every subscriber — unconditionally,
//!    even when it equals the previous value, so sub-stores watching an
//!    unrelated projection still see the tick (their own distinct filter
//!    suppresses redundant downstream notifications).
//! 3. Every-dispatch listeners observe the action.
//! 4. Sequential effects run inline; a follow-up action is dispatched
//!    immediately, before the next sequential effect, and completes before
//!    the outer `dispatch` returns.
//! 5. Concurrent effects are spawned on their own tokio tasks and feed
//!    their follow-up actions back through `dispatch` whenever they
//!    finish.
//!
//! ## Example
//!
//! ```
//! use substore_core::reducer::{ReducerSet, Reducers, combine_reducers};
//! use substore_runtime::Store;
//! # use substore_core::action::Action;
//! # #[derive(Debug)]
//! # struct Add(i64);
//! # impl Action for Add {
//! #     fn as_any(&self) -> &dyn std::any::Any { self }
//! #     fn name(&self) -> &'static str { std::any::type_name::<Self>() }
//! # }
//!
//! struct CounterReducers;
//!
//! impl Reducers<i64> for CounterReducers {
//!     fn reducers(&self) -> ReducerSet<i64> {
//!         ReducerSet::new().on(|state: &mut i64, action: &Add| *state += action.0)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Store::new(0, combine_reducers(&[&CounterReducers]));
//! store.dispatch(Add(2)).await.unwrap();
//! assert_eq!(store.state(), 2);
//! # }
//! ```

/// Error types for the store runtime
pub mod error;

/// The root store and its dispatch loop
pub mod store;

/// Derived sub-store views with change-filtered notifications
pub mod substore;

/// Subscription handles and listener bookkeeping
pub mod subscription;

pub use error::StoreError;
pub use store::Store;
pub use substore::SubStore;
pub use subscription::Subscription;
