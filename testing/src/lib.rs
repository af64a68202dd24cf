//! # Composable Stack Testing
//!
//! Testing utilities for composable reducers and navigation stacks.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given/When/Then harness for reducers
//! - [`assertions`]: Effect assertions, including cancellation inspection
//! - [`diagnostics`]: Capture of stale-route and variant-mismatch diagnostics
//! - [`properties`]: Proptest strategies for navigation paths
//!
//! ## Example
//!
//! ```
//! use composable_stack_core::composition::from_fn;
//! use composable_stack_core::navigation::for_each_route;
//! use composable_stack_core::{smallvec, NavigationAction, NavigationPath, RouteId};
//! use composable_stack_testing::{assertions, ReducerTest};
//!
//! #[derive(Clone, Debug, Default)]
//! struct App {
//!     path: NavigationPath<u8>,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum AppAction {
//!     Path(NavigationAction<u8, ()>),
//! }
//!
//! let reducer = for_each_route(
//!     from_fn(|_: &mut App, _: AppAction, _: &()| smallvec![]),
//!     "path",
//!     |app: &mut App| &mut app.path,
//!     |action| match action {
//!         AppAction::Path(action) => Some(action),
//!     },
//!     AppAction::Path,
//!     from_fn(|_: &mut u8, (): (), _: &()| smallvec![]),
//! );
//!
//! let mut state = App::default();
//! state.path.push(RouteId::new(1), 0)?;
//! state.path.push(RouteId::new(2), 0)?;
//!
//! ReducerTest::new(reducer)
//!     .with_env(())
//!     .given_state(state)
//!     .when_action(AppAction::Path(NavigationAction::pop_to_root()))
//!     .then_state(|app| assert!(app.path.is_empty()))
//!     .then_effects(|effects| assertions::assert_cancels(effects, &["path/1", "path/2"]))
//!     .run();
//! # Ok::<(), composable_stack_core::PathError>(())
//! ```

/// Capture of diagnostics emitted through `tracing`
pub mod diagnostics;

/// Proptest strategies
pub mod properties;

/// Reducer testing utilities
pub mod reducer_test;

pub use diagnostics::{capture_diagnostics, CapturedDiagnostic, DiagnosticCapture};
pub use properties::path_strategy;
pub use reducer_test::{assertions, ReducerTest};
