//! Recording listeners for notification assertions.
//!
//! A probe hands out cloneable listener closures and records everything
//! they are called with, so a test can assert on the exact sequence of
//! notifications a store or sub-store delivered.

use std::sync::{Arc, Mutex, PoisonError};

use substore_core::action::Action;

/// Records every state value delivered to its listener.
///
/// # Example
///
/// ```
/// use substore_testing::StateProbe;
///
/// let probe = StateProbe::new();
/// let listener = probe.listener();
///
/// listener(&1);
/// listener(&2);
/// assert_eq!(probe.values(), vec![1, 2]);
/// ```
#[derive(Debug)]
pub struct StateProbe<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> StateProbe<T>
where
    T: Clone + Send + 'static,
{
    /// Create an empty probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A listener that records each delivered value.
    ///
    /// Cloneable, so one probe can observe several subscriptions.
    #[must_use]
    pub fn listener(&self) -> impl Fn(&T) + Clone + Send + Sync + 'static {
        let values = Arc::clone(&self.values);
        move |value: &T| {
            values
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(value.clone());
        }
    }

    /// Everything recorded so far, in delivery order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently recorded value.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of recorded deliveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was delivered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for StateProbe<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Records the tag of every action delivered to its listener.
///
/// Suited to `on_every_dispatch`: actions are type-erased there, so the
/// probe keeps their [`Action::name`] tags rather than the payloads.
#[derive(Debug)]
pub struct ActionProbe {
    names: Arc<Mutex<Vec<&'static str>>>,
}

impl ActionProbe {
    /// Create an empty probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A listener that records each action's tag.
    #[must_use]
    pub fn listener(&self) -> impl Fn(&dyn Action) + Clone + Send + Sync + 'static {
        let names = Arc::clone(&self.names);
        move |action: &dyn Action| {
            names
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(action.name());
        }
    }

    /// Recorded tags, in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded dispatches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was dispatched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ActionProbe {
    fn default() -> Self {
        Self::new()
    }
}
