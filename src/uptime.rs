//! Uptime Aggregator (§4.8) — windowed availability ratio and average ping,
//! invalidated on every important beat. Grounded in the teacher's
//! `checker.rs` uptime calculation (duration-weighted ratio over a rolling
//! window) and `consensus.rs`'s cache-by-key pattern.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::CoreResult;
use crate::model::{Heartbeat, Status};
use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    monitor_id_hash: u64,
    window_hours: u32,
}

fn hash_str(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Copy)]
pub struct UptimeSnapshot {
    pub ratio: f64,
    pub avg_ping: Option<f64>,
}

/// Computes and caches windowed uptime ratio + average ping per
/// `(monitor_id, window_hours)`. Cache entries are invalidated wholesale for
/// a monitor whenever an important beat lands (§4.2 step 9) — the monitor's
/// history changed shape, so every open window needs recomputing.
pub struct UptimeAggregator {
    repository: std::sync::Arc<dyn Repository>,
    cache: Mutex<HashMap<CacheKey, UptimeSnapshot>>,
    monitor_keys: Mutex<HashMap<String, Vec<CacheKey>>>,
}

impl UptimeAggregator {
    pub fn new(repository: std::sync::Arc<dyn Repository>) -> Self {
        UptimeAggregator {
            repository,
            cache: Mutex::new(HashMap::new()),
            monitor_keys: Mutex::new(HashMap::new()),
        }
    }

    pub fn invalidate(&self, monitor_id: &str) {
        let mut monitor_keys = self.monitor_keys.lock().unwrap();
        if let Some(keys) = monitor_keys.remove(monitor_id) {
            let mut cache = self.cache.lock().unwrap();
            for key in keys {
                cache.remove(&key);
            }
        }
    }

    pub async fn uptime(&self, monitor_id: &str, window_hours: u32) -> CoreResult<UptimeSnapshot> {
        let key = CacheKey {
            monitor_id_hash: hash_str(monitor_id),
            window_hours,
        };
        if let Some(snapshot) = self.cache.lock().unwrap().get(&key).copied() {
            return Ok(snapshot);
        }

        let snapshot = self.compute(monitor_id, window_hours).await?;

        self.cache.lock().unwrap().insert(key, snapshot);
        self.monitor_keys.lock().unwrap().entry(monitor_id.to_string()).or_default().push(key);

        Ok(snapshot)
    }

    async fn compute(&self, monitor_id: &str, window_hours: u32) -> CoreResult<UptimeSnapshot> {
        let now = Utc::now();
        let since = now - Duration::hours(window_hours as i64);
        let beats = self.repository.heartbeats_since(monitor_id, since).await?;
        let avg_ping = average_ping(&beats);

        let (up_secs, total_secs) = windowed_duration(&beats, since);
        let ratio = if total_secs > 0 {
            up_secs as f64 / total_secs as f64
        } else {
            let latest_status = match beats.last() {
                Some(beat) => Some(beat.status),
                None => self.repository.find_latest_heartbeat(monitor_id).await?.map(|b| b.status),
            };
            match latest_status {
                Some(status) if status.counts_as_up_for_uptime() => 1.0,
                _ => 0.0,
            }
        };

        Ok(UptimeSnapshot { ratio, avg_ping })
    }
}

/// Duration-weighted availability (§4.8): each beat carries its own
/// `duration_secs` — the time since the *previous* heartbeat — which is
/// attributed to *this* beat's status and clamped so it never reaches back
/// past `since`. Uses whole seconds throughout, matching the teacher's
/// integer-second accounting to avoid floating point drift on long windows.
fn windowed_duration(beats: &[Heartbeat], since: DateTime<Utc>) -> (i64, i64) {
    let mut up_secs: i64 = 0;
    let mut total_secs: i64 = 0;

    for beat in beats {
        let elapsed_in_window = (beat.time - since).num_seconds().max(0);
        let attributed = beat.duration_secs.max(0).min(elapsed_in_window);
        total_secs += attributed;
        if beat.status.counts_as_up_for_uptime() {
            up_secs += attributed;
        }
    }

    (up_secs, total_secs)
}

fn average_ping(beats: &[Heartbeat]) -> Option<f64> {
    let pings: Vec<i64> = beats
        .iter()
        .filter(|b| b.status == Status::Up)
        .filter_map(|b| b.ping)
        .collect();
    if pings.is_empty() {
        None
    } else {
        Some(pings.iter().sum::<i64>() as f64 / pings.len() as f64)
    }
}
