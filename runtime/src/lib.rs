//! # Composable Stack Runtime
//!
//! Runtime implementation for composable reducers.
//!
//! This crate provides the Store runtime that coordinates reducer execution,
//! effect handling and cancellation.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, serializes reduction and executes effects
//! - **Cancellation registry**: Hierarchical map from [`EffectId`] to running work
//! - **Feedback loop**: Actions produced by effects re-enter the store, unless
//!   their effect was cancelled first
//! - **Navigation binding**: Front-end adapter that turns gestures into
//!   navigation actions against the current path
//!
//! ## Example
//!
//! ```
//! use composable_stack_core::composition::from_fn;
//! use composable_stack_core::{smallvec, Effect};
//! use composable_stack_runtime::Store;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), composable_stack_runtime::StoreError> {
//! let reducer = from_fn(|count: &mut i64, delta: i64, _env: &()| {
//!     *count += delta;
//!     smallvec![Effect::None]
//! });
//!
//! let store = Store::new(0_i64, reducer, ());
//! store.send(5).await?;
//!
//! assert_eq!(store.state(|count| *count).await, 5);
//! # Ok(())
//! # }
//! ```
//!
//! [`EffectId`]: composable_stack_core::EffectId

use composable_stack_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Hierarchical cancellation of running effects
pub mod cancellation;

/// Prometheus metrics for observability
pub mod metrics;

/// Navigation front-end adapter
pub mod navigation;

/// Error types for the Store runtime
pub mod error {
    use composable_stack_core::PathError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for an action or for effects to finish
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// The action broadcast channel was closed, typically because the
        /// store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,

        /// A navigation change was rejected by the path
        #[error("Navigation path rejected the change: {0}")]
        Path(#[from] PathError),
    }
}

pub use cancellation::{CancellationRegistry, Registration};
pub use error::StoreError;
pub use navigation::{ElementCache, StackBinding};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use composable_stack_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for slow observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// that action. An effect counts as finished once its produced action has
/// been reduced, or once it has been cancelled.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle and the tracking context that feeds it
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
            tokens: Vec::new(),
            registrations: Vec::new(),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
///
/// Carries the completion counter of the originating `send` plus the
/// cancellation scopes the effect runs under. Registrations are held for as
/// long as any clone of the context is alive, i.e. until the work finishes.
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
    tokens: Vec<CancellationToken>,
    registrations: Vec<Arc<Registration>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }

    /// Same cancellation scopes, separate completion counter
    fn nested(&self) -> (EffectHandle, Self) {
        let (handle, mut tracking) = EffectHandle::new();
        tracking.tokens.clone_from(&self.tokens);
        tracking.registrations.clone_from(&self.registrations);
        (handle, tracking)
    }

    /// Extend the context with one more cancellation scope
    fn within(mut self, token: CancellationToken, registration: Registration) -> Self {
        self.tokens.push(token);
        self.registrations.push(Arc::new(registration));
        self
    }

    fn is_cancelled(&self) -> bool {
        self.tokens.iter().any(CancellationToken::is_cancelled)
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Run `work` until it finishes or any of `tokens` is cancelled.
///
/// Returns `None` when cancelled.
async fn run_until_cancelled<F>(tokens: &[CancellationToken], work: F) -> Option<F::Output>
where
    F: std::future::Future,
{
    if tokens.is_empty() {
        return Some(work.await);
    }

    let cancelled =
        futures::future::select_all(tokens.iter().map(|token| Box::pin(token.cancelled())));

    tokio::select! {
        biased;
        _ = cancelled => None,
        output = work => Some(output),
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreConfig, StoreError,
        run_until_cancelled,
    };
    use crate::cancellation::CancellationRegistry;
    use crate::metrics::StoreMetrics;
    use composable_stack_core::EffectId;
    use std::future::Future;
    use std::pin::Pin;
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the write lock is the single-writer gate)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// Actions are reduced one at a time, in the order they acquire the lock.
    /// The effects an action returns are dispatched before the lock is
    /// released: cancellations take effect and cancellable work is registered
    /// before the next action can be reduced. Asynchronous work then runs on
    /// tokio tasks and feeds its actions back through the same gate.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        config: StoreConfig,
        cancellations: Arc<CancellationRegistry>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Action broadcast channel for observing actions produced by effects.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default()
        ///     .with_broadcast_capacity(256)
        ///     .with_shutdown_timeout(Duration::from_secs(60));
        ///
        /// let store = Store::with_config(AppState::default(), app_reducer(), env, config);
        /// ```
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                config,
                cancellations: Arc::new(CancellationRegistry::new()),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Create a new Store with custom action broadcast capacity
        ///
        /// Default capacity is 16. Increase if observers frequently lag.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            Self::with_config(
                initial_state,
                reducer,
                environment,
                StoreConfig::default().with_broadcast_capacity(capacity),
            )
        }

        /// The configuration this store was built with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Waits for pending effects to complete (with timeout)
        /// 3. Returns when all effects finish or timeout expires
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            // Set shutdown flag to reject new actions
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Graceful shutdown using the configured default timeout
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// after [`StoreConfig::default_shutdown_timeout`].
        pub async fn shutdown_with_default_timeout(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Dispatches returned effects: cancellations and registrations
        ///    happen immediately, async work is spawned
        /// 4. Releases the lock
        ///
        /// # Returns
        ///
        /// An [`EffectHandle`] that can be used to wait for effect completion.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// If the reducer panics, the panic will propagate and halt the store.
        /// Reducers should be pure functions that do not panic.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.reject_if_shutting_down()?;

            tracing::debug!("Processing action");
            let (handle, tracking) = EffectHandle::new();

            let mut state = self.state.write().await;
            tracing::trace!("Acquired write lock on state");
            self.reduce_locked(&mut state, action, &tracking);

            Ok(handle)
        }

        /// Build an action from the current state and send it atomically
        ///
        /// `build` runs under the same write lock as the reduction, so the
        /// action is always derived from the latest state. Returning `None`
        /// sends nothing.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, build), name = "store_send_from_state")]
        pub async fn send_from_state<F>(&self, build: F) -> Result<Option<EffectHandle>, StoreError>
        where
            F: FnOnce(&S) -> Option<A>,
        {
            self.reject_if_shutting_down()?;

            let mut state = self.state.write().await;
            let Some(action) = build(&state) else {
                tracing::trace!("Builder produced no action");
                return Ok(None);
            };

            let (handle, tracking) = EffectHandle::new();
            self.reduce_locked(&mut state, action, &tracking);
            Ok(Some(handle))
        }

        /// Send an action and wait for a matching result action
        ///
        /// Subscribes to the action broadcast before sending, then waits for
        /// the first effect-produced action matching `predicate`.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        ///
        /// # Notes
        ///
        /// - Only actions produced by effects are broadcast (not the initial action)
        /// - Actions of cancelled effects are never broadcast
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                skipped,
                                "Action observer lagged, {} actions skipped",
                                skipped
                            );
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let depth = store.state(|s| s.path.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Cancel all effects registered under `id` or nested beneath it
        ///
        /// Ordered with reductions: takes effect between two actions.
        /// Returns the number of cancellation scopes that were live.
        pub async fn cancel(&self, id: impl Into<EffectId>) -> usize {
            let id = id.into();
            let _state = self.state.write().await;
            self.apply_cancel(&id)
        }

        /// Cancellation ids with running work, sorted
        #[must_use]
        pub fn active_effect_ids(&self) -> Vec<EffectId> {
            self.cancellations.active_ids()
        }

        /// Whether any work is running under `id` or nested beneath it
        #[must_use]
        pub fn is_effect_active(&self, id: &EffectId) -> bool {
            self.cancellations.is_active(id)
        }

        fn reject_if_shutting_down(&self) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }
            Ok(())
        }

        /// Reduce one action and dispatch its effects. Caller holds the write lock.
        fn reduce_locked(&self, state: &mut S, action: A, tracking: &EffectTracking) {
            StoreMetrics::record_command();

            let start = std::time::Instant::now();
            let effects = {
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();
                self.reducer.reduce(state, action, &self.environment)
            };
            StoreMetrics::record_reduce(start.elapsed(), effects.len());

            tracing::trace!("Reducer completed, returned {} effects", effects.len());
            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }
        }

        fn apply_cancel(&self, id: &EffectId) -> usize {
            let cancelled = self.cancellations.cancel(id);
            StoreMetrics::record_cancelled(cancelled);
            cancelled
        }

        /// Feed an effect-produced action back into the store
        ///
        /// The action is dropped if any scope it was produced under has been
        /// cancelled by the time the write lock is acquired.
        fn feedback(
            &self,
            action: A,
            tokens: Vec<CancellationToken>,
        ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
            let store = self.clone();

            Box::pin(async move {
                let mut state = store.state.write().await;

                if tokens.iter().any(CancellationToken::is_cancelled) {
                    tracing::trace!("Discarding action produced by a cancelled effect");
                    StoreMetrics::record_cancelled(1);
                    return;
                }

                // Broadcast to observers
                let _ = store.action_broadcast.send(action.clone());

                if store.shutdown.load(Ordering::Acquire) {
                    tracing::warn!("Dropped effect action: store is shutting down");
                    metrics::counter!("store.shutdown.rejected_actions").increment(1);
                    return;
                }

                let (_handle, tracking) = EffectHandle::new();
                store.reduce_locked(&mut state, action, &tracking);
            })
        }

        /// Spawn async work producing an optional action, tracked and cancellable
        fn spawn_tracked<F>(&self, tracking: EffectTracking, work: F)
        where
            F: Future<Output = Option<A>> + Send + 'static,
        {
            tracking.increment();

            // Track global pending effects for shutdown
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let store = self.clone();

            tokio::spawn(async move {
                let _pending_guard = pending_guard;
                let tokens = tracking.tokens.clone();
                let _guard = DecrementGuard(tracking);

                match run_until_cancelled(&tokens, work).await {
                    Some(Some(action)) => {
                        tracing::trace!("Effect produced an action, sending to store");
                        store.feedback(action, tokens).await;
                    },
                    Some(None) => tracing::trace!("Effect completed with no action"),
                    None => {
                        tracing::trace!("Effect cancelled before completion");
                        StoreMetrics::record_cancelled(1);
                    },
                }
            });
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        /// - `Cancellable`: Registers the wrapped effect under its id, then executes it
        /// - `Cancel`: Cancels everything registered under the id
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned, so pass by value is intentional
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    StoreMetrics::record_effect("none");
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    StoreMetrics::record_effect("future");
                    self.spawn_tracked(tracking, fut);
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    StoreMetrics::record_effect("delay");
                    self.spawn_tracked(tracking, async move {
                        tokio::time::sleep(duration).await;
                        Some(*action)
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    StoreMetrics::record_effect("parallel");

                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                    StoreMetrics::record_effect("sequential");

                    tracking.increment();
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending_guard = pending_guard;
                        let tokens = tracking.tokens.clone();
                        let _guard = DecrementGuard(tracking.clone());

                        for (idx, effect) in effects.into_iter().enumerate() {
                            if tracking.is_cancelled() {
                                tracing::trace!("Effect::Sequential cancelled at step {}", idx + 1);
                                StoreMetrics::record_cancelled(1);
                                break;
                            }

                            tracing::trace!(
                                "Executing sequential effect {} of {}",
                                idx + 1,
                                effect_count
                            );

                            let (mut step, step_tracking) = tracking.nested();
                            store.execute_effect(effect, step_tracking);

                            // Wait for this step before continuing
                            if run_until_cancelled(&tokens, step.wait()).await.is_none() {
                                tracing::trace!("Effect::Sequential cancelled during step {}", idx + 1);
                                break;
                            }
                        }
                        tracing::trace!("Effect::Sequential completed");
                    });
                },
                Effect::Cancellable {
                    id,
                    cancel_in_flight,
                    effect,
                } => {
                    tracing::trace!(%id, cancel_in_flight, "Executing Effect::Cancellable");
                    StoreMetrics::record_effect("cancellable");

                    if cancel_in_flight {
                        self.apply_cancel(&id);
                    }

                    let (token, registration) = self.cancellations.register(&id);
                    self.execute_effect(*effect, tracking.within(token, registration));
                },
                Effect::Cancel(id) => {
                    tracing::trace!(%id, "Executing Effect::Cancel");
                    StoreMetrics::record_effect("cancel");
                    self.apply_cancel(&id);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                config: self.config.clone(),
                cancellations: Arc::clone(&self.cancellations),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
