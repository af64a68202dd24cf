//! Front-end adapter for navigation stacks.
//!
//! A presentation layer renders a [`NavigationPath`] and turns gestures into
//! navigation actions. [`StackBinding`] does the second half against a
//! [`Store`]: every outgoing `SetPath` is built from the path as it is at the
//! moment of reduction, under the store's write lock, so a gesture can never
//! resurrect a route that an effect removed in the meantime.
//!
//! [`ElementCache`] is the rendering fallback for out-transitions: the last
//! element seen for a route, kept by the view after the route itself is gone.

use crate::{EffectHandle, Store, StoreError};
use composable_stack_core::{
    NavigationAction, NavigationPath, Reducer, Route, RouteId, RouteIdGenerator,
};
use std::sync::Arc;

/// Binds a navigation stack inside a store's state to gesture-level operations.
///
/// - `path` reads the stack out of the root state
/// - `embed` lifts a [`NavigationAction`] into the root action type
///
/// Route ids are minted from a shared [`RouteIdGenerator`]; clones of a
/// binding share it.
pub struct StackBinding<R, T, TA>
where
    R: Reducer,
{
    store: Store<R::State, R::Action, R::Environment, R>,
    path: fn(&R::State) -> &NavigationPath<T>,
    embed: fn(NavigationAction<T, TA>) -> R::Action,
    ids: Arc<RouteIdGenerator>,
}

impl<R, T, TA> StackBinding<R, T, TA>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Send + Sync + 'static,
    R::Action: Send + Clone + 'static,
    R::Environment: Send + Sync + 'static,
    T: Clone,
{
    /// Bind the stack at `path` in `store`'s state.
    #[must_use]
    pub fn new(
        store: Store<R::State, R::Action, R::Environment, R>,
        path: fn(&R::State) -> &NavigationPath<T>,
        embed: fn(NavigationAction<T, TA>) -> R::Action,
    ) -> Self {
        Self::with_ids(store, path, embed, Arc::new(RouteIdGenerator::new()))
    }

    /// Bind with an explicit id generator, e.g. one shared with deep-link parsing.
    #[must_use]
    pub const fn with_ids(
        store: Store<R::State, R::Action, R::Environment, R>,
        path: fn(&R::State) -> &NavigationPath<T>,
        embed: fn(NavigationAction<T, TA>) -> R::Action,
        ids: Arc<RouteIdGenerator>,
    ) -> Self {
        Self {
            store,
            path,
            embed,
            ids,
        }
    }

    /// The bound store.
    #[must_use]
    pub const fn store(&self) -> &Store<R::State, R::Action, R::Environment, R> {
        &self.store
    }

    /// Snapshot of the current path, for rendering.
    pub async fn current_path(&self) -> NavigationPath<T> {
        let path = self.path;
        self.store.state(|state| path(state).clone()).await
    }

    /// Current element of route `id`, if it is still on the path.
    pub async fn element(&self, id: RouteId) -> Option<T> {
        let path = self.path;
        self.store.state(|state| path(state).get(&id).cloned()).await
    }

    /// Push `element` under a freshly minted id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn push(&self, element: T) -> Result<RouteId, StoreError> {
        let (path, embed) = (self.path, self.embed);
        let ids = &self.ids;
        let mut pushed = None;

        self.store
            .send_from_state(|state| {
                let mut next = path(state).clone();
                pushed = Some(next.push_route(ids, element));
                Some(embed(NavigationAction::SetPath(next)))
            })
            .await?;

        // The builder always runs once the store accepts the send
        pushed.ok_or(StoreError::ShutdownInProgress)
    }

    /// Remove the top route. Sends nothing when the path is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn pop(&self) -> Result<Option<RouteId>, StoreError> {
        let (path, embed) = (self.path, self.embed);
        let mut popped = None;

        self.store
            .send_from_state(|state| {
                let current = path(state);
                let (id, _) = current.last()?;
                popped = Some(*id);
                Some(embed(NavigationAction::SetPath(current.drop_last(1))))
            })
            .await?;

        Ok(popped)
    }

    /// Remove every route above `id`, keeping `id` itself on top.
    ///
    /// Returns the number of routes removed. An id no longer on the path
    /// sends nothing and removes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn pop_to(&self, id: RouteId) -> Result<usize, StoreError> {
        let (path, embed) = (self.path, self.embed);
        let mut removed = 0;

        self.store
            .send_from_state(|state| {
                let current = path(state);
                let Some(position) = current.position(&id) else {
                    tracing::debug!(%id, "pop_to target is no longer on the path");
                    return None;
                };
                removed = current.len() - position - 1;
                (removed > 0).then(|| embed(NavigationAction::SetPath(current.drop_last(removed))))
            })
            .await?;

        Ok(removed)
    }

    /// Empty the path, cancelling every route-scoped effect.
    ///
    /// Returns the number of routes removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn pop_to_root(&self) -> Result<usize, StoreError> {
        let (path, embed) = (self.path, self.embed);
        let mut removed = 0;

        self.store
            .send_from_state(|state| {
                removed = path(state).len();
                Some(embed(NavigationAction::pop_to_root()))
            })
            .await?;

        Ok(removed)
    }

    /// Replace the path with `routes`, e.g. when restoring from a deep link.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Path`] if `routes` repeats an id
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    pub async fn set_path<I>(&self, routes: I) -> Result<EffectHandle, StoreError>
    where
        I: IntoIterator<Item = Route<T>>,
    {
        let next = NavigationPath::try_from_routes(routes)?;
        self.store.send((self.embed)(NavigationAction::SetPath(next))).await
    }

    /// Deliver `action` to route `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn send_element(&self, id: RouteId, action: TA) -> Result<EffectHandle, StoreError> {
        self.store
            .send((self.embed)(NavigationAction::element(id, action)))
            .await
    }

    /// Element to render for route `id`, falling back to `cache` once the
    /// route has left the path.
    pub async fn rendered_element(&self, id: RouteId, cache: &mut ElementCache<T>) -> Option<T> {
        let current = self.element(id).await;
        cache.resolve(id, current).cloned()
    }
}

impl<R, T, TA> Clone for StackBinding<R, T, TA>
where
    R: Reducer,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path,
            embed: self.embed,
            ids: Arc::clone(&self.ids),
        }
    }
}

/// Single-slot memory of the last element rendered for a route.
///
/// Owned by the view. Never written back into state and never seen by reducers.
#[derive(Debug, Clone)]
pub struct ElementCache<T> {
    slot: Option<(RouteId, T)>,
}

impl<T> Default for ElementCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ElementCache<T> {
    /// Empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Element to render for `id`.
    ///
    /// A `current` element is remembered and returned. Without one, the
    /// remembered element is returned only if it belongs to `id`.
    pub fn resolve(&mut self, id: RouteId, current: Option<T>) -> Option<&T> {
        if let Some(element) = current {
            self.slot = Some((id, element));
        }

        match &self.slot {
            Some((cached, element)) if *cached == id => Some(element),
            _ => None,
        }
    }

    /// The remembered route and element, if any.
    #[must_use]
    pub fn last_known(&self) -> Option<(RouteId, &T)> {
        self.slot.as_ref().map(|(id, element)| (*id, element))
    }

    /// Forget the remembered element.
    pub fn clear(&mut self) {
        self.slot = None;
    }
}
