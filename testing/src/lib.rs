//! # Substore Testing
//!
//! Testing utilities for the Substore state container.
//!
//! This crate provides:
//! - Recording probes ([`StateProbe`], [`ActionProbe`]) to assert on
//!   notification sequences
//! - [`HandlerTest`], a fluent Given-When-Then harness for reducer sets
//!
//! ## Example
//!
//! ```ignore
//! use substore_testing::StateProbe;
//!
//! let probe = StateProbe::new();
//! let _subscription = store.subscribe(probe.listener());
//!
//! store.dispatch(CounterAction::Increment).await?;
//! assert_eq!(probe.len(), 2); // initial replay + one publication
//! ```


/// Recording listeners for notification assertions
pub mod probes;

pub use handler_test::HandlerTest;
pub use probes::{ActionProbe, StateProbe};
