//! Error types for the store runtime.

use thiserror::Error;

/// Errors surfaced by a [`Store`](crate::Store) dispatch.
///
/// An action with no registered handler is not an error — reducers treat
/// it as identity and effects as "no follow-up". These variants carry
/// failures raised by the handlers themselves.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A reducer handler failed.
    ///
    /// The dispatch stops at the failing handler: the state keeps the
    /// mutations made by earlier handlers in the chain, and no
    /// notification is published for this dispatch.
    #[error("reducer handler for {action} failed: {source}")]
    Reducer {
        /// Tag of the action whose handler failed
        action: &'static str,
        /// The handler's error
        source: anyhow::Error,
    },

    /// An effect handler failed.
    ///
    /// Sequential effects propagate this to the `dispatch` caller that
    /// triggered them (possibly through a nested dispatch). Concurrent
    /// effects report it to the store's error sink instead and are
    /// otherwise treated as producing no follow-up action.
    #[error("effect handler for {action} failed: {source}")]
    Effect {
        /// Tag of the action whose handler failed
        action: &'static str,
        /// The handler's error
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Tag of the action whose handler failed.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Reducer { action, .. } | Self::Effect { action, .. } => action,
        }
    }
}
