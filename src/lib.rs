//! Pulsewatch monitor runtime core — the scheduling, probing, and
//! notification engine behind an uptime/health monitoring service. Ships no
//! HTTP admin surface, CLI, or config-file loader (§1 non-goals); an
//! embedder wires this crate's `Supervisor` into whatever front end it
//! wants.

pub mod classifier;
pub mod env;
pub mod error;
pub mod group;
pub mod live_bus;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod precommand;
pub mod probes;
pub mod repository;
pub mod runtime;
pub mod supervisor;
pub mod tls_tracker;
pub mod uptime;

pub use env::Env;
pub use error::{CoreError, CoreResult};
pub use live_bus::{BroadcastLiveBus, LiveBus, LiveEvent, NullLiveBus};
pub use metrics::{InMemoryMetricsSink, MetricsSink, MonitorGauges};
pub use model::{Heartbeat, Monitor, MonitorType, ProbeConfig, Status};
pub use notifier::{HttpNotifier, Notifier, NotificationPayload, RecordingNotifier};
pub use precommand::{PreCommandRunner, RecordingPreCommandRunner, ShellPreCommandRunner};
pub use probes::{ProbeContext, ProbeDriver, ProbeOutcome, ProbeRegistry};
pub use repository::{Repository, SqliteRepository};
pub use runtime::{MonitorRuntime, RuntimeDeps};
pub use supervisor::Supervisor;
pub use tls_tracker::TlsTracker;
pub use uptime::UptimeAggregator;

/// Initializes the crate's `tracing` subscriber from `RUST_LOG` (§8).
/// Embedders that already run their own subscriber should skip this and
/// just emit spans/events; this is a convenience for standalone use.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
