//! Navigation example binary
//!
//! Pushes a counter and a timer screen, lets the timer tick, then pops to
//! root and shows that the timer stopped with its route.

use anyhow::Context;
use composable_stack_runtime::metrics::MetricsServer;
use composable_stack_runtime::{ElementCache, StackBinding, Store};
use navigation_demo::{
    app_reducer, path_of, AppAction, AppState, CounterAction, DemoEnvironment, Screen, ScreenAction,
    TimerAction, TimerState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "navigation_demo=debug,composable_stack_core=debug,composable_stack_runtime=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsServer::new("127.0.0.1:9090".parse().context("metrics address")?);
    metrics.start().context("installing metrics recorder")?;

    println!("=== Navigation Example: Route-Scoped Effects ===\n");

    let env = DemoEnvironment::new(Duration::from_millis(100));
    // Screens pushed by the root reducer and by the binding draw from one generator
    let route_ids = Arc::clone(&env.route_ids);
    let store = Store::new(AppState::default(), app_reducer(), env);
    let stack = StackBinding::with_ids(store.clone(), path_of, AppAction::Path, route_ids);

    println!(">>> Sending: GoToCounter");
    store.send(AppAction::GoToCounter).await?;
    let counter_id = stack
        .current_path()
        .await
        .last()
        .map(|(id, _)| *id)
        .context("counter screen was pushed")?;

    stack
        .send_element(counter_id, ScreenAction::Counter(CounterAction::Increment))
        .await?;
    stack
        .send_element(counter_id, ScreenAction::Counter(CounterAction::Increment))
        .await?;
    println!("Counter screen {counter_id}: {:?}", stack.element(counter_id).await);

    println!("\n>>> Pushing a timer screen through the binding");
    let timer_id = stack
        .push(Screen::Timer(TimerState::default()))
        .await?;
    stack
        .send_element(timer_id, ScreenAction::Timer(TimerAction::Start))
        .await?;

    tokio::time::sleep(Duration::from_millis(350)).await;
    println!("Timer screen {timer_id}: {:?}", stack.element(timer_id).await);
    println!("Running effects: {:?}", store.active_effect_ids());

    let mut cache = ElementCache::new();
    let _ = stack.rendered_element(timer_id, &mut cache).await;

    println!("\n>>> Sending: PopToRoot");
    store.send(AppAction::PopToRoot).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("Path after pop: {:?}", stack.current_path().await);
    println!("Running effects: {:?}", store.active_effect_ids());
    println!(
        "Last rendered timer (view-only): {:?}",
        stack.rendered_element(timer_id, &mut cache).await
    );

    store
        .shutdown(Duration::from_secs(1))
        .await
        .context("graceful shutdown")?;

    if let Some(rendered) = metrics.render() {
        println!("\n=== Metrics ===\n{rendered}");
    }

    println!("\n=== Navigation Demonstration Complete ===");
    Ok(())
}
