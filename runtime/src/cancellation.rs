//! Hierarchical cancellation registry.
//!
//! Running effects register under an [`EffectId`] and receive a
//! [`CancellationToken`]. Cancelling an id cancels every token registered
//! under that id or any id nested beneath it.
//!
//! Tokens for nested ids are created as children of the nearest registered
//! ancestor's token, so an ancestor's token also reaches descendants that
//! registered while it was live. [`CancellationRegistry::cancel`] walks the
//! map as well, which covers descendants registered before their ancestor.

use composable_stack_core::EffectId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

struct Node {
    token: CancellationToken,
    generation: u64,
    live: usize,
}

/// Map from cancellation id to the token shared by the work running under it.
#[derive(Default)]
pub struct CancellationRegistry {
    nodes: Mutex<HashMap<EffectId, Node>>,
    generations: AtomicU64,
}

impl CancellationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, HashMap<EffectId, Node>> {
        // A poisoned map is still consistent: every mutation is a single insert/remove.
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register one unit of work under `id`.
    ///
    /// Work registered under the same id shares a token. The returned
    /// [`Registration`] keeps the entry alive; the entry is removed once every
    /// registration for it has been dropped.
    pub fn register(self: &Arc<Self>, id: &EffectId) -> (CancellationToken, Registration) {
        let mut nodes = self.nodes();

        if let Some(node) = nodes.get_mut(id) {
            node.live += 1;
            return (
                node.token.clone(),
                Registration {
                    registry: Arc::clone(self),
                    id: id.clone(),
                    generation: node.generation,
                },
            );
        }

        let token = id
            .lineage()
            .filter(|ancestor| ancestor != id)
            .filter_map(|ancestor| nodes.get(&ancestor).map(|node| node.token.clone()))
            .last()
            .map_or_else(CancellationToken::new, |parent| parent.child_token());

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        nodes.insert(
            id.clone(),
            Node {
                token: token.clone(),
                generation,
                live: 1,
            },
        );

        tracing::trace!(%id, "Registered cancellation scope");

        (
            token,
            Registration {
                registry: Arc::clone(self),
                id: id.clone(),
                generation,
            },
        )
    }

    /// Cancel everything registered under `prefix` or nested beneath it.
    ///
    /// Returns the number of scopes cancelled. Cancelling an id with nothing
    /// registered is a no-op.
    pub fn cancel(&self, prefix: &EffectId) -> usize {
        let mut nodes = self.nodes();

        let covered: Vec<EffectId> = nodes
            .keys()
            .filter(|id| prefix.is_prefix_of(id))
            .cloned()
            .collect();

        for id in &covered {
            if let Some(node) = nodes.remove(id) {
                node.token.cancel();
            }
        }

        if !covered.is_empty() {
            tracing::debug!(%prefix, scopes = covered.len(), "Cancelled effects");
        }

        covered.len()
    }

    /// Ids that currently have running work, in sorted order.
    #[must_use]
    pub fn active_ids(&self) -> Vec<EffectId> {
        let mut ids: Vec<EffectId> = self.nodes().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether any work is registered under `prefix` or nested beneath it.
    #[must_use]
    pub fn is_active(&self, prefix: &EffectId) -> bool {
        self.nodes().keys().any(|id| prefix.is_prefix_of(id))
    }

    fn release(&self, id: &EffectId, generation: u64) {
        let mut nodes = self.nodes();
        let finished = match nodes.get_mut(id) {
            Some(node) if node.generation == generation => {
                node.live = node.live.saturating_sub(1);
                node.live == 0
            },
            // Cancelled, possibly re-registered since
            _ => false,
        };
        if finished {
            nodes.remove(id);
        }
    }
}

impl std::fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("active", &self.active_ids())
            .finish_non_exhaustive()
    }
}

/// Lease on a registry entry. Dropping it marks one unit of work as finished.
pub struct Registration {
    registry: Arc<CancellationRegistry>,
    id: EffectId,
    generation: u64,
}

impl Registration {
    /// The id this registration holds.
    #[must_use]
    pub const fn id(&self) -> &EffectId {
        &self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.release(&self.id, self.generation);
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
