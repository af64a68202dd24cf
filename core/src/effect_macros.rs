//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, particularly
//! for async work and cancellable timers inside route reducers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```
/// use composable_stack_core::{async_effect, Effect};
///
/// #[derive(Debug)]
/// enum SearchAction {
///     Results(Vec<String>),
/// }
///
/// let effect: Effect<SearchAction> = async_effect! {
///     Some(SearchAction::Results(vec!["rust".to_string()]))
/// };
/// assert!(matches!(effect, Effect::Future(_)));
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```
/// use composable_stack_core::{delay, Effect};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum TimerAction {
///     Tick,
/// }
///
/// let effect: Effect<TimerAction> = delay! {
///     duration: Duration::from_secs(1),
///     action: TimerAction::Tick
/// };
/// assert!(matches!(effect, Effect::Delay { .. }));
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Wrap an effect so it can be cancelled by id
///
/// With `in_flight: true`, work already running under the same id is
/// cancelled before the new effect starts.
///
/// # Example
///
/// ```
/// use composable_stack_core::{cancellable, delay, Effect};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum TimerAction {
///     Tick,
/// }
///
/// let effect: Effect<TimerAction> = cancellable! {
///     id: "timer",
///     in_flight: true,
///     effect: delay! { duration: Duration::from_secs(1), action: TimerAction::Tick }
/// };
/// assert!(matches!(effect, Effect::Cancellable { cancel_in_flight: true, .. }));
/// ```
#[macro_export]
macro_rules! cancellable {
    (
        id: $id:expr,
        in_flight: $in_flight:expr,
        effect: $effect:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: ::std::convert::Into::<$crate::effect_id::EffectId>::into($id),
            cancel_in_flight: $in_flight,
            effect: ::std::boxed::Box::new($effect),
        }
    };
    (
        id: $id:expr,
        effect: $effect:expr
    ) => {
        $crate::cancellable! { id: $id, in_flight: false, effect: $effect }
    };
}
