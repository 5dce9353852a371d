//! # Dashboard Demo
//!
//! A small dashboard built on the Substore state container.
//!
//! This demo showcases:
//! - A composite root state with a nested panel sub-state
//! - Handler-bearing objects for reducers and effects
//! - Sequential effects fanning one action out into targeted updates
//! - A concurrent effect observing every update without producing one
//! - Sub-store subscriptions, including chained `select` through the
//!   nested panel
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use dashboard::{DashboardReducers, DashboardState, UpdateDraw};
//! use substore_core::reducer::combine_reducers;
//! use substore_runtime::Store;
//!
//! # async fn example() {
//! let store = Store::new(
//!     DashboardState::new(Utc::now()),
//!     combine_reducers(&[&DashboardReducers]),
//! );
//!
//! store.dispatch(UpdateDraw(7)).await.unwrap();
//! assert_eq!(store.state().draw, 7);
//! # }
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;
use substore_core::effect::{EffectSet, Effects, Sequencing};
use substore_core::reducer::{ReducerSet, Reducers};
use substore_macros::Action;

/// Root dashboard state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    /// When the dashboard last ticked
    pub last_tick: DateTime<Utc>,
    /// The current random draw
    pub draw: u32,
    /// Nested panel sub-state
    pub panel: PanelState,
}

impl DashboardState {
    /// A fresh dashboard, stamped with `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_tick: now,
            draw: 0,
            panel: PanelState {
                message: "initial message".to_owned(),
                changed_at: now,
            },
        }
    }
}

/// Panel sub-state nested inside the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    /// Text shown on the panel
    pub message: String,
    /// When the panel last changed
    pub changed_at: DateTime<Utc>,
}

/// Set the dashboard tick timestamp.
#[derive(Action, Debug)]
pub struct UpdateTick(pub DateTime<Utc>);

/// Set the random draw value.
#[derive(Action, Debug)]
pub struct UpdateDraw(pub u32);

/// Set the panel message.
#[derive(Action, Debug)]
pub struct UpdatePanelMessage(pub String);

/// Set the panel timestamp.
#[derive(Action, Debug)]
pub struct UpdatePanelTime(pub DateTime<Utc>);

/// Refresh every dashboard field at once.
///
/// No reducer handles this action directly — the refresh effects fan it
/// out into the targeted update actions above.
#[derive(Action, Debug)]
pub struct RefreshAll;

/// The dashboard's reducer handlers: one per targeted update action,
/// covering root-state fields and nested panel fields alike.
pub struct DashboardReducers;

impl Reducers<DashboardState> for DashboardReducers {
    fn reducers(&self) -> ReducerSet<DashboardState> {
        ReducerSet::new()
            .on(|state: &mut DashboardState, action: &UpdateTick| {
                state.last_tick = action.0;
            })
            .on(|state: &mut DashboardState, action: &UpdateDraw| {
                state.draw = action.0;
            })
            .on(|state: &mut DashboardState, action: &UpdatePanelMessage| {
                state.panel.message.clone_from(&action.0);
            })
            .on(|state: &mut DashboardState, action: &UpdatePanelTime| {
                state.panel.changed_at = action.0;
            })
    }
}

/// Sequential effects fanning [`RefreshAll`] out into targeted updates.
///
/// Sequential so the whole refresh completes before the triggering
/// `dispatch` returns: each handler's follow-up action is dispatched
/// inline, in declaration order.
pub struct RefreshEffects;

impl Effects<DashboardState> for RefreshEffects {
    fn sequencing(&self) -> Sequencing {
        Sequencing::Sequential
    }

    fn effects(&self) -> EffectSet<DashboardState> {
        EffectSet::new()
            .on(|_: &DashboardState, _: &RefreshAll| {
                Some(Box::new(UpdateTick(Utc::now())))
            })
            .on(|_: &DashboardState, _: &RefreshAll| {
                Some(Box::new(UpdateDraw(rand::thread_rng().gen_range(0..100))))
            })
            .on(|_: &DashboardState, _: &RefreshAll| {
                Some(Box::new(UpdatePanelMessage(format!(
                    "refreshed at {}",
                    Utc::now().format("%H:%M:%S%.3f")
                ))))
            })
            .on(|_: &DashboardState, _: &RefreshAll| {
                Some(Box::new(UpdatePanelTime(Utc::now())))
            })
    }
}

/// Concurrent effect observing every targeted update.
///
/// Logs the update off the dispatch path and produces no follow-up.
pub struct AuditEffects;

impl Effects<DashboardState> for AuditEffects {
    fn effects(&self) -> EffectSet<DashboardState> {
        EffectSet::new()
            .on(|state: &DashboardState, action: &UpdateTick| {
                tracing::info!(at = %action.0, draw = state.draw, "tick updated");
                None
            })
            .on(|_: &DashboardState, action: &UpdateDraw| {
                tracing::info!(draw = action.0, "draw updated");
                None
            })
            .on(|_: &DashboardState, action: &UpdatePanelMessage| {
                tracing::info!(message = %action.0, "panel message updated");
                None
            })
            .on(|_: &DashboardState, action: &UpdatePanelTime| {
                tracing::info!(at = %action.0, "panel time updated");
                None
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use substore_testing::HandlerTest;

    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn targeted_updates_touch_only_their_field() {
        HandlerTest::new(&DashboardReducers)
            .given_state(DashboardState::new(epoch()))
            .when_action(UpdateDraw(42))
            .when_action(UpdatePanelMessage("hello".to_owned()))
            .then_state(|state| {
                assert_eq!(state.draw, 42);
                assert_eq!(state.panel.message, "hello");
                assert_eq!(state.last_tick, DateTime::<Utc>::UNIX_EPOCH);
            })
            .run();
    }

    #[test]
    fn refresh_all_has_no_reducer_of_its_own() {
        HandlerTest::new(&DashboardReducers)
            .given_state(DashboardState::new(epoch()))
            .when_action(RefreshAll)
            .then_state(|state| {
                assert_eq!(*state, DashboardState::new(DateTime::<Utc>::UNIX_EPOCH));
            })
            .run();
    }

    #[test]
    fn refresh_effects_are_sequential_and_cover_every_field() {
        let effects = RefreshEffects.effects();
        assert_eq!(effects.len(), 4);
        assert_eq!(RefreshEffects.sequencing(), Sequencing::Sequential);
    }

    #[test]
    fn audit_effects_default_to_concurrent() {
        assert_eq!(AuditEffects.sequencing(), Sequencing::Concurrent);
    }
}
