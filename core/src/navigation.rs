//! Navigation stacks.
//!
//! A [`NavigationPath`] is an [`IdentifiedArray`] of per-screen states keyed by
//! [`RouteId`]. Index 0 is the root-most pushed screen. A [`NavigationAction`]
//! either addresses one route (`Element`) or replaces the whole path (`SetPath`).
//!
//! [`for_each_route`] wires a per-route reducer into a parent feature. Every
//! effect a route starts is scoped under `namespace/<route id>`, and whenever a
//! route leaves the path, by `SetPath` or by the parent reducer's own logic, a
//! cancellation for that scope is issued in the same reduction.

use crate::diagnostics::Diagnostic;
use crate::effect::Effect;
use crate::effect_id::EffectId;
use crate::identified::{IdentifiedArray, PathError};
use crate::reducer::Reducer;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of one route in a navigation path.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RouteId(u64);

impl RouteId {
    /// Wrap a raw id value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a navigation path.
///
/// The id is fixed at creation; the element may be mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route<T> {
    id: RouteId,
    /// Per-screen state
    pub element: T,
}

impl<T> Route<T> {
    /// Create a route.
    #[must_use]
    pub const fn new(id: RouteId, element: T) -> Self {
        Self { id, element }
    }

    /// The route's identity.
    #[must_use]
    pub const fn id(&self) -> RouteId {
        self.id
    }
}

impl<T> From<Route<T>> for (RouteId, T) {
    fn from(route: Route<T>) -> Self {
        (route.id, route.element)
    }
}

/// Ordered stack of routes, root-most first.
pub type NavigationPath<T> = IdentifiedArray<RouteId, T>;

impl<T> NavigationPath<T> {
    /// Build a path from routes, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::DuplicateId`] if two routes share an id.
    pub fn try_from_routes<I>(routes: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = Route<T>>,
    {
        Self::try_from_iter(routes.into_iter().map(Into::into))
    }

    /// Append `element` under a freshly minted id and return that id.
    ///
    /// Ids already present in the path are skipped, so this never fails.
    pub fn push_route(&mut self, ids: &RouteIdGenerator, element: T) -> RouteId {
        let mut id = ids.next_id();
        while self.contains(&id) {
            id = ids.next_id();
        }
        let pushed = self.push(id, element);
        debug_assert!(pushed.is_ok(), "minted route id {id} already on the path");
        id
    }

    /// Route at `position`, borrowed.
    #[must_use]
    pub fn route_at(&self, position: usize) -> Option<Route<&T>> {
        self.get_at(position)
            .map(|(id, element)| Route::new(*id, element))
    }
}

/// Mints route ids.
///
/// Ids are handed out in increasing order and never repeat for the lifetime
/// of the generator, so every push gets a fresh cancellation scope.
#[derive(Debug, Default)]
pub struct RouteIdGenerator {
    next: AtomicU64,
}

impl RouteIdGenerator {
    /// Generator starting at 0.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Generator whose first id is `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Mint the next id.
    pub fn next_id(&self) -> RouteId {
        RouteId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Actions understood by a navigation stack.
///
/// - `T`: per-route state
/// - `A`: per-route action
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationAction<T, A> {
    /// Deliver `action` to the route identified by `id`
    Element {
        /// Target route
        id: RouteId,
        /// Action for that route's reducer
        action: A,
    },

    /// Replace the path wholesale
    SetPath(NavigationPath<T>),
}

impl<T, A> NavigationAction<T, A> {
    /// Address a single route.
    #[must_use]
    pub const fn element(id: RouteId, action: A) -> Self {
        Self::Element { id, action }
    }

    /// Empty the path, cancelling every route-scoped effect.
    #[must_use]
    pub fn pop_to_root() -> Self {
        Self::SetPath(NavigationPath::new())
    }
}

/// Cancellation scope of the route `id` in the stack named `namespace`.
#[must_use]
pub fn route_effect_id(namespace: &EffectId, id: RouteId) -> EffectId {
    namespace.child(id)
}

/// Run `element` over the routes of a navigation path, alongside `base`.
///
/// - `namespace`: cancellation scope of the whole stack; route `n` owns `namespace/n`
/// - `path`: accessor for the path inside the parent state
/// - `extract_action` / `embed_action`: map between parent actions and navigation actions
///
/// `base` always runs, after navigation handling, with the original action.
///
/// # Example
///
/// ```
/// use composable_stack_core::composition::from_fn;
/// use composable_stack_core::navigation::for_each_route;
/// use composable_stack_core::{
///     smallvec, Effect, NavigationAction, NavigationPath, Reducer, RouteIdGenerator,
/// };
///
/// #[derive(Clone, Debug, Default)]
/// struct App {
///     path: NavigationPath<u32>,
/// }
///
/// #[derive(Clone, Debug)]
/// enum AppAction {
///     Path(NavigationAction<u32, u32>),
/// }
///
/// let app = for_each_route(
///     from_fn(|_: &mut App, _: AppAction, _: &()| smallvec![]),
///     "path",
///     |app: &mut App| &mut app.path,
///     |action| match action {
///         AppAction::Path(action) => Some(action),
///     },
///     AppAction::Path,
///     from_fn(|count: &mut u32, add: u32, _: &()| {
///         *count += add;
///         smallvec![Effect::None]
///     }),
/// );
///
/// let ids = RouteIdGenerator::new();
/// let mut state = App::default();
/// let first = state.path.push_route(&ids, 0);
///
/// let _ = app.reduce(&mut state, AppAction::Path(NavigationAction::element(first, 5)), &());
/// assert_eq!(state.path.get(&first), Some(&5));
///
/// let effects = app.reduce(&mut state, AppAction::Path(NavigationAction::pop_to_root()), &());
/// assert!(state.path.is_empty());
/// assert_eq!(effects[0].cancelled_ids()[0].to_string(), format!("path/{first}"));
/// ```
#[must_use]
pub fn for_each_route<B, R>(
    base: B,
    namespace: impl Into<EffectId>,
    path: fn(&mut B::State) -> &mut NavigationPath<R::State>,
    extract_action: fn(B::Action) -> Option<NavigationAction<R::State, R::Action>>,
    embed_action: fn(NavigationAction<R::State, R::Action>) -> B::Action,
    element: R,
) -> ForEachRoute<B, R>
where
    B: Reducer,
    R: Reducer<Environment = B::Environment>,
{
    ForEachRoute {
        base,
        namespace: namespace.into(),
        path,
        extract_action,
        embed_action,
        element,
    }
}

/// A parent reducer augmented with a navigation stack.
///
/// Created by [`for_each_route`].
pub struct ForEachRoute<B, R>
where
    B: Reducer,
    R: Reducer,
{
    base: B,
    namespace: EffectId,
    path: fn(&mut B::State) -> &mut NavigationPath<R::State>,
    extract_action: fn(B::Action) -> Option<NavigationAction<R::State, R::Action>>,
    embed_action: fn(NavigationAction<R::State, R::Action>) -> B::Action,
    element: R,
}

impl<B, R> ForEachRoute<B, R>
where
    B: Reducer,
    R: Reducer<Environment = B::Environment>,
    B::Action: Send + 'static,
    R::State: 'static,
    R::Action: fmt::Debug + Send + 'static,
{
    /// Cancellation scope of the whole stack.
    #[must_use]
    pub const fn namespace(&self) -> &EffectId {
        &self.namespace
    }

    fn reduce_element(
        &self,
        state: &mut B::State,
        id: RouteId,
        action: R::Action,
        env: &B::Environment,
    ) -> SmallVec<[Effect<B::Action>; 4]> {
        let Some(element) = (self.path)(state).get_mut(&id) else {
            Diagnostic::StaleRoute {
                namespace: self.namespace.to_string(),
                id,
                action: format!("{action:?}"),
            }
            .report();
            return SmallVec::new();
        };

        let scope = route_effect_id(&self.namespace, id);
        let embed = self.embed_action;

        self.element
            .reduce(element, action, env)
            .into_iter()
            .map(|effect| {
                effect
                    .map(move |action| embed(NavigationAction::Element { id, action }))
                    .scoped(&scope)
            })
            .collect()
    }
}

impl<B, R> Reducer for ForEachRoute<B, R>
where
    B: Reducer,
    R: Reducer<Environment = B::Environment>,
    B::Action: Clone + Send + 'static,
    R::State: 'static,
    R::Action: fmt::Debug + Send + 'static,
{
    type State = B::State;
    type Action = B::Action;
    type Environment = B::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let before: Vec<RouteId> = (self.path)(state).ids().copied().collect();
        let mut effects = SmallVec::new();

        match (self.extract_action)(action.clone()) {
            Some(NavigationAction::Element { id, action }) => {
                effects.extend(self.reduce_element(state, id, action, env));
            },
            Some(NavigationAction::SetPath(new_path)) => {
                tracing::debug!(
                    namespace = %self.namespace,
                    from = before.len(),
                    to = new_path.len(),
                    "Replacing navigation path"
                );
                *(self.path)(state) = new_path;
            },
            None => {},
        }

        effects.extend(self.base.reduce(state, action, env));

        let path = (self.path)(state);
        let removed: Vec<RouteId> = before.into_iter().filter(|id| !path.contains(id)).collect();

        if !removed.is_empty() {
            tracing::debug!(namespace = %self.namespace, ?removed, "Cancelling removed routes");
            metrics::counter!("navigation.routes.cancelled").increment(removed.len() as u64);
            effects.extend(
                removed
                    .into_iter()
                    .map(|id| Effect::Cancel(route_effect_id(&self.namespace, id))),
            );
        }

        effects
    }
}
