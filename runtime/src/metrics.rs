//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the store runtime:
//! - Actions reduced and reducer latency
//! - Effects dispatched, by kind
//! - Effects cancelled, including routes removed from a navigation path
//! - Navigation diagnostics (stale routes, variant mismatches)
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_stack_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(rendered) = server.render() {
//!     println!("{rendered}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics exporter.
///
/// Installs the global recorder and renders the Prometheus text format.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address the scrape endpoint is advertised on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by an earlier test), this
    /// logs a warning and leaves [`MetricsServer::handle`] empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed - scrape at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!("store.commands.total", "Total number of actions reduced by stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_counter!(
        "store.effects.executed",
        "Effects dispatched by stores, labelled by kind"
    );
    describe_counter!(
        "store.effects.cancelled",
        "Cancellation scopes cancelled plus effect actions discarded after cancellation"
    );
    describe_counter!("store.shutdown.initiated", "Graceful shutdowns started");
    describe_counter!("store.shutdown.completed", "Graceful shutdowns that drained all effects");
    describe_counter!("store.shutdown.timeout", "Graceful shutdowns that timed out");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Navigation
    describe_counter!(
        "navigation.routes.cancelled",
        "Routes removed from a navigation path whose effects were cancelled"
    );
    describe_counter!(
        "navigation.diagnostics",
        "Programmer-error diagnostics, labelled by kind"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an action entering the reducer.
    pub fn record_command() {
        counter!("store.commands.total").increment(1);
    }

    /// Record a finished reduction and how many effects it returned.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_reduce(duration: Duration, effects: usize) {
        histogram!("store.reducer.duration_seconds").record(duration.as_secs_f64());
        histogram!("store.reducer.effects_returned").record(effects as f64);
    }

    /// Record one dispatched effect of the given kind.
    pub fn record_effect(kind: &'static str) {
        counter!("store.effects.executed", "kind" => kind).increment(1);
    }

    /// Record cancelled scopes or discarded effect actions.
    pub fn record_cancelled(count: usize) {
        if count > 0 {
            counter!("store.effects.cancelled").increment(count as u64);
        }
    }
}
