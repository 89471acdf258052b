//! Immutable configuration snapshot threaded into every tick (§9, §11).
//!
//! Generalizes the teacher's scattered `std::env::var` knobs
//! (`HEARTBEAT_RETENTION_DAYS`, `PROBE_STALE_MINUTES`, `MONITOR_RATE_LIMIT`)
//! into one typed snapshot, since the core has many more tunables than the
//! checker loop it's descended from. `Env` is built once and reloaded
//! explicitly via [`Env::reload`]; a tick never re-reads it mid-flight.

use std::sync::Arc;

use crate::repository::Repository;

pub const DEFAULT_MIN_INTERVAL_SECOND: u32 = 20;
pub const DEFAULT_MAX_INTERVAL_SECOND: u32 = 86_400;
pub const PUSH_BUFFER_MS: u64 = 1000;
pub const PROBE_ABORT_PADDING_SECS: f64 = 10.0;
pub const DEFAULT_TLS_EXPIRY_NOTIFY_DAYS: &[u32] = &[7, 14, 21];

#[derive(Debug, Clone)]
pub struct Env {
    pub min_interval_secs: u32,
    pub max_interval_secs: u32,
    pub demo_mode: bool,
    pub tls_expiry_notify_days: Vec<u32>,
    pub timezone: chrono_tz::Tz,
    pub push_buffer_ms: u64,
    pub probe_abort_padding_secs: f64,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECOND,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECOND,
            demo_mode: false,
            tls_expiry_notify_days: DEFAULT_TLS_EXPIRY_NOTIFY_DAYS.to_vec(),
            timezone: chrono_tz::UTC,
            push_buffer_ms: PUSH_BUFFER_MS,
            probe_abort_padding_secs: PROBE_ABORT_PADDING_SECS,
        }
    }
}

impl Env {
    /// Re-reads the `settings` table and produces a fresh snapshot. Callers
    /// swap their `Arc<Env>` for the new one; in-flight ticks keep using the
    /// snapshot they started with.
    pub async fn reload(repository: &Arc<dyn Repository>) -> Self {
        let mut env = Env::default();

        if let Ok(Some(raw)) = repository.get_setting("tls_expiry_notify_days").await {
            if let Ok(days) = serde_json::from_str::<Vec<u32>>(&raw) {
                if !days.is_empty() {
                    env.tls_expiry_notify_days = days;
                }
            }
        }
        if let Ok(Some(raw)) = repository.get_setting("timezone").await {
            if let Ok(tz) = raw.parse() {
                env.timezone = tz;
            }
        }
        if let Ok(Some(raw)) = repository.get_setting("demo_mode").await {
            env.demo_mode = raw == "true" || raw == "1";
        }

        env
    }

    /// §4.2 step 1: clamp the configured interval, widening it in demo mode.
    pub fn normalize_interval(&self, interval_secs: u32) -> u32 {
        let mut beat_interval = interval_secs.max(1);
        if self.demo_mode {
            beat_interval = beat_interval.max(20);
        }
        beat_interval
    }
}
