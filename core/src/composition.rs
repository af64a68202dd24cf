//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`from_fn`**: Build a reducer directly from a closure
//! - **`combine_reducers`**: Run multiple reducers on the same state/action, in order
//! - **`scope`**: Embed a child reducer whose state is always present in the parent
//! - **`scope_variant`**: Embed a child reducer whose state is one alternative of the parent
//!
//! Addressing uses plain function pointers: a getter/setter pair for structural
//! embedding, an extractor/constructor pair for variant embedding, and an
//! extractor/constructor pair for actions. Non-capturing closures coerce to them.
//!
//! # Ordering
//!
//! Composition order is significant and never changed. A reducer that runs
//! first observes the state before later reducers touch it. If an earlier
//! reducer moves the parent state into another alternative, a later
//! [`scope_variant`] reducer sees a mismatch and drops the action.
//!
//! # Examples
//!
//! ```
//! use composable_stack_core::composition::{combine_reducers, from_fn, scope};
//! use composable_stack_core::{smallvec, Effect, Reducer};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Counter {
//!     count: i32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! #[derive(Clone, Debug, Default)]
//! struct App {
//!     counter: Counter,
//!     log: Vec<String>,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum AppAction {
//!     Counter(CounterAction),
//! }
//!
//! let counter = from_fn(|state: &mut Counter, action: CounterAction, _env: &()| {
//!     match action {
//!         CounterAction::Increment => state.count += 1,
//!     }
//!     smallvec![Effect::None]
//! });
//!
//! let logger = from_fn(|state: &mut App, action: AppAction, _env: &()| {
//!     state.log.push(format!("{action:?}"));
//!     smallvec![Effect::None]
//! });
//!
//! let app = combine_reducers(vec![
//!     Box::new(scope(
//!         counter,
//!         |app: &App| &app.counter,
//!         |app: &mut App, counter| app.counter = counter,
//!         |action| match action {
//!             AppAction::Counter(action) => Some(action),
//!         },
//!         AppAction::Counter,
//!     )),
//!     Box::new(logger),
//! ]);
//!
//! let mut state = App::default();
//! let _ = app.reduce(&mut state, AppAction::Counter(CounterAction::Increment), &());
//! assert_eq!(state.counter.count, 1);
//! assert_eq!(state.log.len(), 1);
//! ```

use crate::diagnostics::Diagnostic;
use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;
use std::fmt;
use std::marker::PhantomData;

/// A type-erased reducer, as accepted by [`combine_reducers`].
pub type BoxedReducer<S, A, E> =
    Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Build a reducer from a closure.
///
/// The closure is the reducer: it receives the state, the action and the
/// environment and returns effects.
#[must_use]
pub fn from_fn<S, A, E, F>(f: F) -> FnReducer<S, A, E, F>
where
    F: Fn(&mut S, A, &E) -> SmallVec<[Effect<A>; 4]>,
{
    FnReducer {
        f,
        _phantom: PhantomData,
    }
}

/// A reducer backed by a closure.
///
/// Created by [`from_fn`].
pub struct FnReducer<S, A, E, F> {
    f: F,
    _phantom: PhantomData<fn(&mut S, A, &E)>,
}

impl<S, A, E, F> Reducer for FnReducer<S, A, E, F>
where
    F: Fn(&mut S, A, &E) -> SmallVec<[Effect<A>; 4]>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(&self, state: &mut S, action: A, env: &E) -> SmallVec<[Effect<A>; 4]> {
        (self.f)(state, action, env)
    }
}

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in the declared order with a clone of the action, and
/// all effects are concatenated in that same order.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<BoxedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<BoxedReducer<S, A, E>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Embed a child reducer into a field of the parent state.
///
/// For every parent action that `extract_action` maps to a child action, the
/// child reducer runs against the field read by `get_state`, the result is
/// written back with `set_state`, and the child's effects are remapped with
/// `embed_action`. Cancellation ids are kept as they are. Other actions are
/// ignored.
#[must_use]
pub fn scope<S, A, R>(
    child: R,
    get_state: fn(&S) -> &R::State,
    set_state: fn(&mut S, R::State),
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
) -> Scope<S, A, R>
where
    R: Reducer,
{
    Scope {
        child,
        get_state,
        set_state,
        extract_action,
        embed_action,
    }
}

/// A child reducer embedded into a parent's state field.
///
/// Created by [`scope`].
pub struct Scope<S, A, R>
where
    R: Reducer,
{
    child: R,
    get_state: fn(&S) -> &R::State,
    set_state: fn(&mut S, R::State),
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
}

impl<S, A, R> Reducer for Scope<S, A, R>
where
    R: Reducer,
    R::State: Clone,
    R::Action: Send + 'static,
    A: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut S,
        action: A,
        env: &R::Environment,
    ) -> SmallVec<[Effect<A>; 4]> {
        let Some(child_action) = (self.extract_action)(action) else {
            return SmallVec::new();
        };

        let mut child_state = (self.get_state)(state).clone();
        let effects = self.child.reduce(&mut child_state, child_action, env);
        (self.set_state)(state, child_state);

        effects
            .into_iter()
            .map(|effect| effect.map(self.embed_action))
            .collect()
    }
}

/// Embed a child reducer whose state is one alternative of the parent state.
///
/// On a matching action, `extract_state` tries to read the child state out of
/// the current alternative. When it succeeds the child reducer runs and the
/// result is written back with `embed_state`. When the parent currently holds
/// another alternative, the action is dropped: no mutation, no effect, and a
/// [`Diagnostic::VariantMismatch`] naming the reducer, the state type and the
/// action is reported.
#[must_use]
pub fn scope_variant<S, A, R>(
    child: R,
    extract_state: fn(&S) -> Option<R::State>,
    embed_state: fn(R::State) -> S,
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
) -> ScopeVariant<S, A, R>
where
    R: Reducer,
{
    ScopeVariant {
        child,
        extract_state,
        embed_state,
        extract_action,
        embed_action,
    }
}

/// A child reducer embedded into one alternative of a parent state.
///
/// Created by [`scope_variant`].
pub struct ScopeVariant<S, A, R>
where
    R: Reducer,
{
    child: R,
    extract_state: fn(&S) -> Option<R::State>,
    embed_state: fn(R::State) -> S,
    extract_action: fn(A) -> Option<R::Action>,
    embed_action: fn(R::Action) -> A,
}

impl<S, A, R> Reducer for ScopeVariant<S, A, R>
where
    R: Reducer,
    R::Action: Send + 'static,
    A: fmt::Debug + Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut S,
        action: A,
        env: &R::Environment,
    ) -> SmallVec<[Effect<A>; 4]> {
        let Some(child_action) = (self.extract_action)(action) else {
            return SmallVec::new();
        };

        let Some(mut child_state) = (self.extract_state)(state) else {
            Diagnostic::VariantMismatch {
                reducer: std::any::type_name::<R>(),
                state: std::any::type_name::<S>(),
                action: format!("{:?}", (self.embed_action)(child_action)),
            }
            .report();
            return SmallVec::new();
        };

        let effects = self.child.reduce(&mut child_state, child_action, env);
        *state = (self.embed_state)(child_state);

        effects
            .into_iter()
            .map(|effect| effect.map(self.embed_action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Counter {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum CounterAction {
        Add(i32),
        Tick,
    }

    struct CounterReducer {
        calls: Arc<AtomicUsize>,
    }

    impl Reducer for CounterReducer {
        type State = Counter;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Counter,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match action {
                CounterAction::Add(n) => {
                    state.value += n;
                    smallvec![Effect::Delay {
                        duration: Duration::from_millis(10),
                        action: Box::new(CounterAction::Tick),
                    }
                    .cancellable("tick")]
                },
                CounterAction::Tick => smallvec![Effect::None],
            }
        }
    }

    fn counter() -> (CounterReducer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CounterReducer {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    // Structural embedding
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Dashboard {
        counter: Counter,
        title: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum DashboardAction {
        Counter(CounterAction),
        Rename(String),
    }

    fn extract_counter(action: DashboardAction) -> Option<CounterAction> {
        match action {
            DashboardAction::Counter(action) => Some(action),
            DashboardAction::Rename(_) => None,
        }
    }

    #[test]
    fn test_scope_runs_child_once_and_remaps_effects() {
        let (reducer, calls) = counter();
        let scoped = scope(
            reducer,
            |parent: &Dashboard| &parent.counter,
            |parent: &mut Dashboard, counter| parent.counter = counter,
            extract_counter,
            DashboardAction::Counter,
        );

        let mut state = Dashboard {
            counter: Counter { value: 5 },
            title: "main".to_string(),
        };

        let effects = scoped.reduce(&mut state, DashboardAction::Counter(CounterAction::Add(3)), &());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.counter.value, 8);
        assert_eq!(state.title, "main");
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Cancellable { id, effect, .. } => {
                assert_eq!(id.to_string(), "tick");
                assert!(matches!(
                    **effect,
                    Effect::Delay { ref action, .. }
                        if **action == DashboardAction::Counter(CounterAction::Tick)
                ));
            },
            other => unreachable!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn test_scope_ignores_other_actions() {
        let (reducer, calls) = counter();
        let scoped = scope(
            reducer,
            |parent: &Dashboard| &parent.counter,
            |parent: &mut Dashboard, counter| parent.counter = counter,
            extract_counter,
            DashboardAction::Counter,
        );

        let mut state = Dashboard::default();
        let effects = scoped.reduce(&mut state, DashboardAction::Rename("x".to_string()), &());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(effects.is_empty());
        assert_eq!(state, Dashboard::default());
    }

    // Variant embedding
    #[derive(Clone, Debug, PartialEq)]
    enum Screen {
        Counter(Counter),
        Settings,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ScreenAction {
        Counter(CounterAction),
        OpenSettings,
    }

    fn counter_screen(reducer: CounterReducer) -> ScopeVariant<Screen, ScreenAction, CounterReducer> {
        scope_variant(
            reducer,
            |screen: &Screen| match screen {
                Screen::Counter(counter) => Some(counter.clone()),
                Screen::Settings => None,
            },
            Screen::Counter,
            |action| match action {
                ScreenAction::Counter(action) => Some(action),
                ScreenAction::OpenSettings => None,
            },
            ScreenAction::Counter,
        )
    }

    #[test]
    fn test_scope_variant_commits_on_match() {
        let (reducer, calls) = counter();
        let reducer = counter_screen(reducer);

        let mut state = Screen::Counter(Counter { value: 1 });
        let effects = reducer.reduce(&mut state, ScreenAction::Counter(CounterAction::Add(2)), &());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state, Screen::Counter(Counter { value: 3 }));
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_scope_variant_drops_on_mismatch() {
        let (reducer, calls) = counter();
        let reducer = counter_screen(reducer);

        let mut state = Screen::Settings;
        let effects = reducer.reduce(&mut state, ScreenAction::Counter(CounterAction::Add(2)), &());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(state, Screen::Settings);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_combine_preserves_declared_order() {
        // Switching the alternative first starves the variant reducer.
        let navigate = || {
            from_fn(|state: &mut Screen, action: ScreenAction, _env: &()| {
                if matches!(action, ScreenAction::Counter(CounterAction::Add(_))) {
                    *state = Screen::Settings;
                }
                smallvec![Effect::None]
            })
        };

        let (first, first_calls) = counter();
        let variant_first = combine_reducers(vec![
            Box::new(counter_screen(first)),
            Box::new(navigate()),
        ]);
        let mut state = Screen::Counter(Counter::default());
        let _ = variant_first.reduce(&mut state, ScreenAction::Counter(CounterAction::Add(1)), &());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state, Screen::Settings);

        let (second, second_calls) = counter();
        let navigate_first = combine_reducers(vec![
            Box::new(navigate()),
            Box::new(counter_screen(second)),
        ]);
        let mut state = Screen::Counter(Counter::default());
        let _ = navigate_first.reduce(&mut state, ScreenAction::Counter(CounterAction::Add(1)), &());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(state, Screen::Settings);
    }

    #[test]
    fn test_combine_concatenates_effects_in_order() {
        let first = from_fn(|_: &mut i32, _: u8, _: &()| smallvec![Effect::cancel("first")]);
        let second = from_fn(|_: &mut i32, _: u8, _: &()| smallvec![Effect::cancel("second")]);
        let combined = combine_reducers(vec![Box::new(first), Box::new(second)]);

        let effects = combined.reduce(&mut 0, 1, &());
        let ids: Vec<String> = effects
            .iter()
            .flat_map(Effect::cancelled_ids)
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
