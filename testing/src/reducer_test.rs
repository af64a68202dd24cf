//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use composable_stack_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// With several actions, state assertions see the state after the last one
/// and effect assertions see the effects of the last one.
///
/// # Example
///
/// ```ignore
/// use composable_stack_testing::{assertions, ReducerTest};
///
/// ReducerTest::new(app_reducer())
///     .with_env(())
///     .given_state(state_with_two_routes())
///     .when_action(AppAction::Path(NavigationAction::pop_to_root()))
///     .then_state(|state| assert!(state.path.is_empty()))
///     .then_effects(|effects| assertions::assert_cancels(effects, &["path/1", "path/2"]))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions, reduced in order (When)
    #[must_use]
    pub fn when_actions<I>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
    {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, environment, or at least one action is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use composable_stack_core::{effect::Effect, EffectId};
    use std::collections::BTreeSet;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect, possibly
    /// wrapped in a cancellation scope
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        fn is_future<A>(effect: &Effect<A>) -> bool {
            match effect {
                Effect::Future(_) => true,
                Effect::Cancellable { effect, .. } => is_future(effect),
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().any(is_future)
                },
                _ => false,
            }
        }

        assert!(
            effects.iter().any(is_future),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Every id cancelled by `effects`, in order of appearance
    #[must_use]
    pub fn cancelled_ids<A>(effects: &[Effect<A>]) -> Vec<EffectId> {
        effects
            .iter()
            .flat_map(Effect::cancelled_ids)
            .cloned()
            .collect()
    }

    /// Every id `effects` register work under, outermost first
    #[must_use]
    pub fn registered_ids<A>(effects: &[Effect<A>]) -> Vec<EffectId> {
        fn collect<A>(effect: &Effect<A>, ids: &mut Vec<EffectId>) {
            match effect {
                Effect::Cancellable { id, effect, .. } => {
                    ids.push(id.clone());
                    collect(effect, ids);
                },
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    for effect in effects {
                        collect(effect, ids);
                    }
                },
                _ => {},
            }
        }

        let mut ids = Vec::new();
        for effect in effects {
            collect(effect, &mut ids);
        }
        ids
    }

    /// Assert that `effects` cancel exactly the given ids, in any order
    ///
    /// Ids are written with `/` between segments, e.g. `"path/3"`.
    ///
    /// # Panics
    ///
    /// Panics if the cancelled set differs from `expected`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<A>(effects: &[Effect<A>], expected: &[&str]) {
        let actual: BTreeSet<String> = cancelled_ids(effects)
            .iter()
            .map(ToString::to_string)
            .collect();
        let expected: BTreeSet<String> = expected.iter().map(|id| (*id).to_string()).collect();

        assert_eq!(
            actual, expected,
            "Expected cancellations {expected:?}, but found {actual:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_stack_core::effect::Effect;
    use composable_stack_core::reducer::Reducer;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
        StartTimer,
        StopTimer,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    smallvec::smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.count -= 1;
                    smallvec::smallvec![Effect::None]
                },
                TestAction::StartTimer => smallvec::smallvec![
                    Effect::Delay {
                        duration: Duration::from_secs(1),
                        action: Box::new(TestAction::Increment),
                    }
                    .cancellable("timer")
                ],
                TestAction::StopTimer => smallvec::smallvec![Effect::cancel("timer")],
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_multiple_actions() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_actions([TestAction::Decrement, TestAction::Decrement, TestAction::StopTimer])
            .then_state(|state| {
                assert_eq!(state.count, 3);
            })
            .then_effects(|effects| {
                assertions::assert_cancels(effects, &["timer"]);
            })
            .run();
    }

    #[test]
    fn test_registered_ids() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::StartTimer)
            .then_effects(|effects| {
                let ids = assertions::registered_ids(effects);
                assert_eq!(ids.len(), 1);
                assert_eq!(ids[0].to_string(), "timer");
                assert!(assertions::cancelled_ids(effects).is_empty());
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<TestAction>::None], 1);
        assertions::assert_effects_count::<TestAction>(&[], 0);
    }

    #[test]
    fn test_future_inside_scope_is_found() {
        let effect = Effect::<TestAction>::Future(Box::pin(async { None }))
            .scoped(&composable_stack_core::EffectId::new("path").child(1));
        assertions::assert_has_future_effect(&[effect]);
    }

    #[test]
    #[should_panic(expected = "Expected cancellations")]
    fn test_assert_cancels_reports_mismatch() {
        assertions::assert_cancels(&[Effect::<TestAction>::cancel("a")], &["b"]);
    }
}
