//! Non-fatal diagnostics for application logic errors.
//!
//! Stale route references and variant mismatches are integration mistakes,
//! not runtime failures: the offending action is dropped, state is left as is,
//! and a [`Diagnostic`] is reported so the host can see what happened.
//!
//! Diagnostics are emitted as `WARN` events on [`DIAGNOSTIC_TARGET`] with a
//! `kind` field, and counted under the `navigation.diagnostics` metric.

use crate::navigation::RouteId;
use std::fmt;

/// `tracing` target used for every diagnostic event.
pub const DIAGNOSTIC_TARGET: &str = "composable_stack::diagnostic";

/// A recoverable application logic error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// An element action named a route id that is not in the path.
    ///
    /// Happens legitimately when an effect completes for a route that was
    /// popped just before.
    StaleRoute {
        /// Namespace of the navigation stack
        namespace: String,
        /// The missing route id
        id: RouteId,
        /// `Debug` rendering of the dropped action
        action: String,
    },

    /// A variant-embedded reducer received an action while the parent state
    /// occupied a different alternative.
    VariantMismatch {
        /// Type name of the child reducer
        reducer: &'static str,
        /// Type name of the parent state
        state: &'static str,
        /// `Debug` rendering of the dropped action
        action: String,
    },
}

impl Diagnostic {
    /// Stable label for this diagnostic, used as the `kind` field and metric label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StaleRoute { .. } => "stale_route",
            Self::VariantMismatch { .. } => "variant_mismatch",
        }
    }

    /// Emit this diagnostic through `tracing` and `metrics`.
    pub fn report(&self) {
        tracing::warn!(target: DIAGNOSTIC_TARGET, kind = self.kind(), "{self}");
        metrics::counter!("navigation.diagnostics", "kind" => self.kind()).increment(1);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleRoute {
                namespace,
                id,
                action,
            } => write!(
                f,
                "Element action for route {id} in '{namespace}' received after the route left the path: {action}"
            ),
            Self::VariantMismatch {
                reducer,
                state,
                action,
            } => write!(
                f,
                "{reducer} received {action} while {state} holds a different variant; \
                 check the order reducers are combined in"
            ),
        }
    }
}
