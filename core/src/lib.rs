//! # Composable Stack Core
//!
//! Core traits and types for building applications out of small, composable reducers.
//!
//! Independent state/action features ("reducers") are composed into a tree. Actions
//! enter at the root and are routed to the subtree that owns them. Every reducer may
//! return effects: descriptions of asynchronous work, tagged with a cancellation
//! identity, that the runtime executes out of line and feeds back as further actions.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`, mutating state in place
//! - **Effect**: Side effect descriptions (not execution), optionally cancellable by [`EffectId`]
//! - **Navigation path**: A stack of child states with stable identities ([`NavigationPath`])
//!
//! ## Composition
//!
//! - [`composition::combine_reducers`]: run several reducers in a declared order
//! - [`composition::scope`]: embed a child whose state is always present in the parent
//! - [`composition::scope_variant`]: embed a child whose state is one alternative of the parent
//! - [`navigation::for_each_route`]: run a per-route reducer over a navigation stack and
//!   cancel the effects of routes that disappear
//!
//! ## Example
//!
//! ```
//! use composable_stack_core::{smallvec, Effect, Reducer, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Increment => state.count += 1,
//!             CounterAction::Decrement => state.count -= 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = CounterState::default();
//! let _ = CounterReducer.reduce(&mut state, CounterAction::Increment, &());
//! assert_eq!(state.count, 1);
//! ```

// Re-export commonly used types
pub use smallvec::{smallvec, SmallVec};

/// Reducer composition utilities
pub mod composition;

/// Non-fatal diagnostics for application logic errors
pub mod diagnostics;

/// Hierarchical cancellation identities for effects
pub mod effect_id;

/// Declarative macros for effect construction
pub mod effect_macros;

/// Ordered collection with stable identities
pub mod identified;

/// Navigation stacks: routes, navigation actions and the per-route combinator
pub mod navigation;

pub use effect::Effect;
pub use effect_id::EffectId;
pub use identified::{IdentifiedArray, PathError};
pub use navigation::{NavigationAction, NavigationPath, Route, RouteId, RouteIdGenerator};
pub use reducer::Reducer;

/// Reducer module - The core trait for business logic
///
/// Reducers are functions: `(State, Action, Environment) → (State, Effects)`
///
/// They run synchronously to completion, mutate state in place and describe
/// asynchronous work as returned effects.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for ProfileReducer {
    ///     type State = ProfileState;
    ///     type Action = ProfileAction;
    ///     type Environment = ProfileEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ProfileState,
    ///         action: ProfileAction,
    ///         env: &ProfileEnvironment,
    ///     ) -> SmallVec<[Effect<ProfileAction>; 4]> {
    ///         match action {
    ///             ProfileAction::Rename(name) => {
    ///                 state.name = name;
    ///                 smallvec![Effect::None]
    ///             }
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This function:
        /// 1. Inspects the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// It must not suspend or block: all asynchronous work belongs in
        /// the returned effects.
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// The effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }

    impl<R> Reducer for Box<R>
    where
        R: Reducer + ?Sized,
    {
        type State = R::State;
        type Action = R::Action;
        type Environment = R::Environment;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            (**self).reduce(state, action, env)
        }
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use super::effect_id::EffectId;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    ///
    /// # Failures
    ///
    /// There is no failure channel: an effect that can fail reports the failure
    /// by producing an action describing it.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` registered under `id` so it can be cancelled later
        Cancellable {
            /// Cancellation identity of the wrapped work
            id: EffectId,
            /// Cancel work already registered under `id` before starting
            cancel_in_flight: bool,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Cancel all work registered under this id or any id nested beneath it
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect,
                } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("cancel_in_flight", cancel_in_flight)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Cancel everything registered under `id`
        #[must_use]
        pub fn cancel(id: impl Into<EffectId>) -> Effect<Action> {
            Effect::Cancel(id.into())
        }

        /// Whether this is [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Make this effect cancellable under `id`
        #[must_use]
        pub fn cancellable(self, id: impl Into<EffectId>) -> Effect<Action> {
            Effect::Cancellable {
                id: id.into(),
                cancel_in_flight: false,
                effect: Box::new(self),
            }
        }

        /// Make this effect cancellable under `id`, cancelling any work already
        /// running under the same id first
        ///
        /// At most one logical context is in flight per id this way.
        #[must_use]
        pub fn cancellable_in_flight(self, id: impl Into<EffectId>) -> Effect<Action> {
            Effect::Cancellable {
                id: id.into(),
                cancel_in_flight: true,
                effect: Box::new(self),
            }
        }

        /// Narrow this effect's cancellation context to `scope`
        ///
        /// Every id nested inside the effect is re-rooted beneath `scope`, and the
        /// effect as a whole becomes cancellable under `scope`. Cancelling `scope`
        /// therefore stops all of it, while ids chosen by the producing reducer
        /// stay local to that scope.
        ///
        /// ```
        /// use composable_stack_core::{Effect, EffectId};
        ///
        /// let scope = EffectId::new("path").child(3);
        /// let effect = Effect::<()>::cancel("timer").scoped(&scope);
        ///
        /// match effect {
        ///     Effect::Cancellable { id, effect, .. } => {
        ///         assert_eq!(id, scope);
        ///         assert!(matches!(*effect, Effect::Cancel(ref inner) if inner.to_string() == "path/3/timer"));
        ///     }
        ///     other => unreachable!("unexpected {other:?}"),
        /// }
        /// ```
        #[must_use]
        pub fn scoped(self, scope: &EffectId) -> Effect<Action> {
            match self.rebase(scope) {
                Effect::None => Effect::None,
                effect => Effect::Cancellable {
                    id: scope.clone(),
                    cancel_in_flight: false,
                    effect: Box::new(effect),
                },
            }
        }

        fn rebase(self, scope: &EffectId) -> Effect<Action> {
            match self {
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| e.rebase(scope)).collect())
                },
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| e.rebase(scope)).collect())
                },
                Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect,
                } => Effect::Cancellable {
                    id: scope.join(&id),
                    cancel_in_flight,
                    effect: Box::new(effect.rebase(scope)),
                },
                Effect::Cancel(id) => Effect::Cancel(scope.join(&id)),
                other => other,
            }
        }

        /// Ids cancelled by this effect, in the order they appear
        #[must_use]
        pub fn cancelled_ids(&self) -> Vec<&EffectId> {
            let mut ids = Vec::new();
            self.collect_cancelled(&mut ids);
            ids
        }

        fn collect_cancelled<'a>(&'a self, ids: &mut Vec<&'a EffectId>) {
            match self {
                Effect::Cancel(id) => ids.push(id),
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    for effect in effects {
                        effect.collect_cancelled(ids);
                    }
                },
                Effect::Cancellable { effect, .. } => effect.collect_cancelled(ids),
                Effect::None | Effect::Delay { .. } | Effect::Future(_) => {},
            }
        }
    }

    impl<Action> Effect<Action>
    where
        Action: Send + 'static,
    {
        /// Transform the actions this effect produces
        ///
        /// Used when embedding a child reducer: the child's effects are remapped
        /// into the parent's action type. Cancellation ids are preserved.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            self.map_shared(&Arc::new(f))
        }

        fn map_shared<B, F>(self, f: &Arc<F>) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| e.map_shared(f)).collect())
                },
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| e.map_shared(f)).collect())
                },
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new((**f)(*action)),
                },
                Effect::Future(fut) => {
                    let f = Arc::clone(f);
                    Effect::Future(Box::pin(async move { fut.await.map(&*f) }))
                },
                Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect,
                } => Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect: Box::new(effect.map_shared(f)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[derive(Debug, Clone, PartialEq)]
        enum Child {
            Done(u32),
        }

        #[derive(Debug, Clone, PartialEq)]
        enum Parent {
            Child(Child),
        }

        #[test]
        fn test_map_preserves_cancellation_ids() {
            let effect = Effect::Delay {
                duration: Duration::from_millis(5),
                action: Box::new(Child::Done(1)),
            }
            .cancellable("load");

            match effect.map(Parent::Child) {
                Effect::Cancellable { id, effect, .. } => {
                    assert_eq!(id, EffectId::new("load"));
                    assert!(matches!(
                        *effect,
                        Effect::Delay { ref action, .. } if **action == Parent::Child(Child::Done(1))
                    ));
                },
                other => unreachable!("unexpected effect {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_map_future_output() {
            let effect: Effect<Child> = Effect::Future(Box::pin(async { Some(Child::Done(7)) }));

            let Effect::Future(fut) = effect.map(Parent::Child) else {
                unreachable!("map keeps the future variant");
            };
            assert_eq!(fut.await, Some(Parent::Child(Child::Done(7))));
        }

        #[test]
        fn test_scoped_rebases_nested_ids() {
            let scope = EffectId::new("path").child(2);
            let effect: Effect<Child> = Effect::merge(vec![
                Effect::None.cancellable("timer"),
                Effect::cancel("search"),
            ])
            .scoped(&scope);

            assert_eq!(
                effect
                    .cancelled_ids()
                    .into_iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
                vec!["path/2/search".to_string()]
            );

            let Effect::Cancellable { id, effect, .. } = effect else {
                unreachable!("scoped wraps the effect");
            };
            assert_eq!(id, scope);
            let Effect::Parallel(children) = *effect else {
                unreachable!("inner effect is kept");
            };
            assert!(matches!(
                &children[0],
                Effect::Cancellable { id, .. } if id.to_string() == "path/2/timer"
            ));
        }

        #[test]
        fn test_scoped_none_stays_none() {
            let effect: Effect<Child> = Effect::None.scoped(&EffectId::new("path"));
            assert!(effect.is_none());
        }
    }
}
