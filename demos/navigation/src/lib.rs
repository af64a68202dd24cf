//! # Navigation Example
//!
//! A root feature hosting a stack of screens.
//!
//! This example showcases:
//! - A navigation path whose elements are an enum of screens
//! - Variant embedding: one reducer per screen, combined over the enum
//! - Route-scoped effects: a timer screen ticks until it is stopped or popped
//! - Pop-to-root from the root reducer's own logic
//!
//! ## Architecture
//!
//! ```text
//! AppState
//! └── path: NavigationPath<Screen>
//!     ├── Screen::Counter(CounterState)   ← counter_reducer
//!     └── Screen::Timer(TimerState)       ← timer_reducer
//! ```
//!
//! Every effect a screen starts runs under `path/<route id>`. When a route
//! leaves the path, that scope is cancelled, so a popped timer never ticks
//! again.
//!
//! ## Example
//!
//! ```no_run
//! use composable_stack_runtime::Store;
//! use navigation_demo::{app_reducer, AppAction, AppState, DemoEnvironment};
//!
//! # async fn example() -> Result<(), composable_stack_runtime::StoreError> {
//! let store = Store::new(AppState::default(), app_reducer(), DemoEnvironment::default());
//!
//! store.send(AppAction::GoToTimer).await?;
//! store.send(AppAction::PopToRoot).await?;
//! assert!(store.state(|s| s.path.is_empty()).await);
//! # Ok(())
//! # }
//! ```

use composable_stack_core::composition::{combine_reducers, from_fn, scope_variant, BoxedReducer};
use composable_stack_core::navigation::for_each_route;
use composable_stack_core::{
    cancellable, delay, effect::Effect, reducer::Reducer, smallvec, NavigationAction, NavigationPath, RouteIdGenerator,
    SmallVec,
};
use std::sync::Arc;
use std::time::Duration;

/// Counter screen state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    /// Current count value
    pub count: i64,
}

/// Counter screen actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// Increment the counter by 1
    Increment,
    /// Decrement the counter by 1
    Decrement,
}

/// Timer screen state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerState {
    /// Ticks received so far
    pub ticks: u32,
    /// Whether the next tick is scheduled
    pub running: bool,
}

/// Timer screen actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// Start ticking
    Start,
    /// Stop ticking
    Stop,
    /// One tick elapsed
    Tick,
}

/// A screen on the navigation stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Counter screen
    Counter(CounterState),
    /// Timer screen
    Timer(TimerState),
}

/// Actions addressed to a screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenAction {
    /// For a counter screen
    Counter(CounterAction),
    /// For a timer screen
    Timer(TimerAction),
}

/// Root state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// The navigation stack, root-most first
    pub path: NavigationPath<Screen>,
    /// Number of screens pushed since launch
    pub pushes: u32,
}

/// Root actions
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Navigation stack actions
    Path(NavigationAction<Screen, ScreenAction>),
    /// Push a new counter screen
    GoToCounter,
    /// Push a new timer screen
    GoToTimer,
    /// Remove every screen
    PopToRoot,
}

/// Dependencies shared by every reducer of the example
#[derive(Debug, Clone)]
pub struct DemoEnvironment {
    /// Time between two timer ticks
    pub tick_interval: Duration,
    /// Source of route ids for screens pushed by the root reducer
    pub route_ids: Arc<RouteIdGenerator>,
}

impl DemoEnvironment {
    /// Environment with the given tick interval
    #[must_use]
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            route_ids: Arc::new(RouteIdGenerator::new()),
        }
    }
}

impl Default for DemoEnvironment {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

/// Cancellation id of a timer's pending tick, local to its route
pub const TICK_ID: &str = "tick";

/// Counter screen logic
///
/// Pure state machine: every action returns `Effect::None`.
#[must_use]
pub fn counter_reducer(
    state: &mut CounterState,
    action: CounterAction,
    _env: &DemoEnvironment,
) -> SmallVec<[Effect<CounterAction>; 4]> {
    match action {
        CounterAction::Increment => state.count += 1,
        CounterAction::Decrement => state.count -= 1,
    }
    smallvec![Effect::None]
}

fn schedule_tick(env: &DemoEnvironment) -> Effect<TimerAction> {
    cancellable! {
        id: TICK_ID,
        in_flight: true,
        effect: delay! { duration: env.tick_interval, action: TimerAction::Tick }
    }
}

/// Timer screen logic
///
/// At most one tick is pending at a time.
#[must_use]
pub fn timer_reducer(
    state: &mut TimerState,
    action: TimerAction,
    env: &DemoEnvironment,
) -> SmallVec<[Effect<TimerAction>; 4]> {
    match action {
        TimerAction::Start => {
            state.running = true;
            smallvec![schedule_tick(env)]
        },
        TimerAction::Stop => {
            state.running = false;
            smallvec![Effect::cancel(TICK_ID)]
        },
        TimerAction::Tick => {
            state.ticks += 1;
            if state.running {
                smallvec![schedule_tick(env)]
            } else {
                smallvec![Effect::None]
            }
        },
    }
}

/// Per-screen reducer: each screen's reducer only sees its own variant
#[must_use]
pub fn screen_reducer() -> impl Reducer<State = Screen, Action = ScreenAction, Environment = DemoEnvironment> {
    let counter: BoxedReducer<Screen, ScreenAction, DemoEnvironment> = Box::new(scope_variant(
        from_fn(counter_reducer),
        |screen: &Screen| match screen {
            Screen::Counter(state) => Some(state.clone()),
            Screen::Timer(_) => None,
        },
        Screen::Counter,
        |action| match action {
            ScreenAction::Counter(action) => Some(action),
            ScreenAction::Timer(_) => None,
        },
        ScreenAction::Counter,
    ));

    let timer: BoxedReducer<Screen, ScreenAction, DemoEnvironment> = Box::new(scope_variant(
        from_fn(timer_reducer),
        |screen: &Screen| match screen {
            Screen::Timer(state) => Some(state.clone()),
            Screen::Counter(_) => None,
        },
        Screen::Timer,
        |action| match action {
            ScreenAction::Timer(action) => Some(action),
            ScreenAction::Counter(_) => None,
        },
        ScreenAction::Timer,
    ));

    combine_reducers(vec![counter, timer])
}

fn root_reducer(
    state: &mut AppState,
    action: AppAction,
    env: &DemoEnvironment,
) -> SmallVec<[Effect<AppAction>; 4]> {
    match action {
        AppAction::GoToCounter => {
            let id = state
                .path
                .push_route(&env.route_ids, Screen::Counter(CounterState::default()));
            state.pushes += 1;
            tracing::debug!(%id, "Pushed counter screen");
        },
        AppAction::GoToTimer => {
            let id = state
                .path
                .push_route(&env.route_ids, Screen::Timer(TimerState::default()));
            state.pushes += 1;
            tracing::debug!(%id, "Pushed timer screen");
        },
        AppAction::PopToRoot => {
            // Cancellation of the removed routes is added by `for_each_route`
            state.path.clear();
        },
        AppAction::Path(_) => {},
    }
    smallvec![]
}

/// The complete application reducer
#[must_use]
pub fn app_reducer() -> impl Reducer<State = AppState, Action = AppAction, Environment = DemoEnvironment> {
    for_each_route(
        from_fn(root_reducer),
        "path",
        |state: &mut AppState| &mut state.path,
        |action| match action {
            AppAction::Path(action) => Some(action),
            _ => None,
        },
        AppAction::Path,
        screen_reducer(),
    )
}

/// Read the stack out of the root state, for a `StackBinding`
#[must_use]
pub const fn path_of(state: &AppState) -> &NavigationPath<Screen> {
    &state.path
}
