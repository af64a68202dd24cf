//! Capture of programmer-error diagnostics in tests.
//!
//! Stale routes and variant mismatches are not errors the caller can see: the
//! action is dropped and a warning is emitted on
//! [`DIAGNOSTIC_TARGET`]. These helpers install a `tracing` subscriber that
//! records those warnings so tests can assert on them.
//!
//! ```
//! use composable_stack_core::diagnostics::Diagnostic;
//! use composable_stack_core::RouteId;
//! use composable_stack_testing::diagnostics::capture_diagnostics;
//!
//! let ((), captured) = capture_diagnostics(|| {
//!     Diagnostic::StaleRoute {
//!         namespace: "path".to_string(),
//!         id: RouteId::new(2),
//!         action: "Tick".to_string(),
//!     }
//!     .report();
//! });
//!
//! assert_eq!(captured.len(), 1);
//! assert_eq!(captured[0].kind, "stale_route");
//! ```

use composable_stack_core::diagnostics::DIAGNOSTIC_TARGET;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// One diagnostic as it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedDiagnostic {
    /// Diagnostic kind, e.g. `stale_route`
    pub kind: String,
    /// Rendered message
    pub message: String,
}

type Sink = Arc<Mutex<Vec<CapturedDiagnostic>>>;

struct CaptureLayer {
    sink: Sink,
}

#[derive(Default)]
struct DiagnosticVisitor {
    kind: String,
    message: String,
}

impl Visit for DiagnosticVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "kind" => self.kind = value.to_string(),
            "message" => self.message = value.to_string(),
            _ => {},
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "kind" => self.kind = format!("{value:?}"),
            "message" => self.message = format!("{value:?}"),
            _ => {},
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != DIAGNOSTIC_TARGET {
            return;
        }

        let mut visitor = DiagnosticVisitor::default();
        event.record(&mut visitor);

        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedDiagnostic {
                kind: visitor.kind,
                message: visitor.message,
            });
    }
}

fn subscriber(sink: &Sink) -> impl Subscriber + Send + Sync {
    Registry::default().with(CaptureLayer {
        sink: Arc::clone(sink),
    })
}

/// Run `f` and return its result with every diagnostic it emitted.
///
/// Only diagnostics emitted on the calling thread are captured.
pub fn capture_diagnostics<F, T>(f: F) -> (T, Vec<CapturedDiagnostic>)
where
    F: FnOnce() -> T,
{
    let sink = Sink::default();
    let output = tracing::subscriber::with_default(subscriber(&sink), f);
    let captured = std::mem::take(&mut *sink.lock().unwrap_or_else(PoisonError::into_inner));
    (output, captured)
}

/// Records diagnostics on the current thread until dropped.
///
/// Suited to `#[tokio::test]`, whose default runtime runs every task on the
/// test thread.
pub struct DiagnosticCapture {
    sink: Sink,
    _guard: DefaultGuard,
}

impl DiagnosticCapture {
    /// Start capturing.
    #[must_use]
    pub fn install() -> Self {
        let sink = Sink::default();
        let guard = tracing::subscriber::set_default(subscriber(&sink));
        Self {
            sink,
            _guard: guard,
        }
    }

    /// Diagnostics captured so far.
    #[must_use]
    pub fn captured(&self) -> Vec<CapturedDiagnostic> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured diagnostics of the given kind.
    #[must_use]
    pub fn of_kind(&self, kind: &str) -> Vec<CapturedDiagnostic> {
        self.captured()
            .into_iter()
            .filter(|diagnostic| diagnostic.kind == kind)
            .collect()
    }
}

impl fmt::Debug for DiagnosticCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticCapture")
            .field("captured", &self.captured())
            .finish_non_exhaustive()
    }
}
