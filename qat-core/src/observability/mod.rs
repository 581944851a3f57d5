//! Observability infrastructure: tracing and metrics.
//!
//! The Prometheus exporter is installed by the daemon; without it the metric
//! macros used throughout the crate are no-ops.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod metrics;

/// Initialize the global tracing subscriber and describe core metrics.
///
/// `RUST_LOG` directives are honored; `debug_enabled` raises the floor to DEBUG.
/// Fails if a global subscriber is already installed.
pub fn init(debug_enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = if debug_enabled { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .try_init()?;

    metrics::register_core_metrics();

    tracing::info!(debug = debug_enabled, "Observability initialized");
    Ok(())
}
