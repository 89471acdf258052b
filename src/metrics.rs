//! MetricsSink (§1, §4.7, §4.2 step 10) — per-monitor gauges/counters for
//! status, ping, and certificate days-remaining. The teacher has no metrics
//! layer of its own (it serves dashboards straight from SQLite), so this is
//! enriched from the pack's observability idiom (`Hakolsound-MIDInet`,
//! `Dicklesworthstone-frankenterm`) rather than invented from nothing: plain
//! atomics/maps behind a trait, pollable by whatever exporter the embedder
//! wants (Prometheus, StatsD, ...).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{Heartbeat, Status, TlsInfo};

pub trait MetricsSink: Send + Sync {
    fn observe_heartbeat(&self, heartbeat: &Heartbeat);
    fn observe_tls(&self, monitor_id: &str, tls_info: &TlsInfo);
}

#[derive(Debug, Clone, Default)]
pub struct MonitorGauges {
    pub status: Option<Status>,
    pub ping_ms: Option<i64>,
    pub min_cert_days_remaining: Option<i64>,
}

/// In-memory snapshot sink. Safe to poll from an admin surface the embedder
/// builds; this crate doesn't ship one (§1 non-goals).
#[derive(Default)]
pub struct InMemoryMetricsSink {
    gauges: Mutex<HashMap<String, MonitorGauges>>,
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, monitor_id: &str) -> Option<MonitorGauges> {
        self.gauges.lock().unwrap().get(monitor_id).cloned()
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn observe_heartbeat(&self, heartbeat: &Heartbeat) {
        let mut gauges = self.gauges.lock().unwrap();
        let entry = gauges.entry(heartbeat.monitor_id.clone()).or_default();
        entry.status = Some(heartbeat.status);
        entry.ping_ms = heartbeat.ping;
    }

    fn observe_tls(&self, monitor_id: &str, tls_info: &TlsInfo) {
        let mut gauges = self.gauges.lock().unwrap();
        let entry = gauges.entry(monitor_id.to_string()).or_default();
        entry.min_cert_days_remaining = tls_info.chain.iter().map(|c| c.days_remaining).min();
    }
}
