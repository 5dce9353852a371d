//! Dashboard demo binary
//!
//! Drives the Substore state container the way the GUI would: targeted
//! update actions, a refresh-all fan-out, and sub-store subscriptions
//! printing each view as it changes.

use std::time::Duration;

use chrono::Utc;
use dashboard::{
    AuditEffects, DashboardReducers, DashboardState, PanelState, RefreshAll, RefreshEffects,
    UpdateDraw, UpdatePanelMessage, UpdateTick,
};
use substore_core::{Action, combine_effects, combine_reducers};
use substore_runtime::Store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), substore_runtime::StoreError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard=info,substore_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Dashboard Demo: Substore State Container ===\n");

    let store = Store::with_effects(
        DashboardState::new(Utc::now()),
        combine_reducers(&[&DashboardReducers]),
        combine_effects(&[&RefreshEffects, &AuditEffects]),
    );

    // Views over the root state.
    let _tick = store
        .select(|state: &DashboardState| state.last_tick)
        .subscribe(|tick| println!("tick view      : {tick}"));
    let _draw = store
        .select(|state: &DashboardState| state.draw)
        .subscribe(|draw| println!("draw view      : {draw}"));

    // Chained selection through the nested panel sub-state.
    let panel = store.select(|state: &DashboardState| state.panel.clone());
    let _message = panel
        .select(|panel: &PanelState| panel.message.clone())
        .subscribe(|message| println!("message view   : {message}"));
    let _changed = panel
        .select(|panel: &PanelState| panel.changed_at)
        .subscribe(|changed_at| println!("changed-at view: {changed_at}"));

    store.on_every_dispatch(|action: &dyn Action| {
        println!("dispatched     : {}", action.name());
    });

    println!("\n>>> Dispatching: UpdateTick");
    store.dispatch(UpdateTick(Utc::now())).await?;

    println!("\n>>> Dispatching: UpdateDraw(7)");
    store.dispatch(UpdateDraw(7)).await?;

    println!("\n>>> Dispatching: UpdatePanelMessage");
    store
        .dispatch(UpdatePanelMessage("hello from the console".to_owned()))
        .await?;

    println!("\n>>> Dispatching: RefreshAll");
    store.dispatch(RefreshAll).await?;

    // Let the concurrent audit effects drain before reading the result.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = store.state();
    println!("\nFinal state:");
    println!("  last_tick : {}", state.last_tick);
    println!("  draw      : {}", state.draw);
    println!("  panel     : {} ({})", state.panel.message, state.panel.changed_at);

    println!("\n=== Demo complete ===");
    Ok(())
}
