//! LiveBus (§6.3) — pushes heartbeats and aggregated stats to subscribers,
//! keyed by owner identity. Grounded in the teacher's `sse::EventBroadcaster`:
//! one `tokio::sync::broadcast` channel, fire-and-forget sends, subscribers
//! filter by identity on the receiving end.

use std::collections::HashSet;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{Heartbeat, TlsInfo};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LiveEvent {
    Heartbeat { owner_id: String, heartbeat: Heartbeat },
    AvgPing { owner_id: String, monitor_id: String, window_hours: u32, avg_ms: Option<f64> },
    Uptime { owner_id: String, monitor_id: String, window_hours: u32, ratio: f64 },
    CertInfo { owner_id: String, monitor_id: String, tls_info: TlsInfo },
}

impl LiveEvent {
    pub fn owner_id(&self) -> &str {
        match self {
            LiveEvent::Heartbeat { owner_id, .. }
            | LiveEvent::AvgPing { owner_id, .. }
            | LiveEvent::Uptime { owner_id, .. }
            | LiveEvent::CertInfo { owner_id, .. } => owner_id,
        }
    }
}

/// Pushes live updates to connected clients. `has_subscribers` backs the
/// backpressure rule in §4.2 step 9 and §5: stats are only computed when
/// someone is actually listening for this owner.
pub trait LiveBus: Send + Sync {
    fn emit(&self, event: LiveEvent);
    fn has_subscribers(&self, owner_id: &str) -> bool;
}

/// In-process broadcast bus. Every subscriber receives every event and
/// filters by `owner_id` on the receiving end, same as the teacher's SSE
/// stream filtering by `monitor_id`.
pub struct BroadcastLiveBus {
    sender: broadcast::Sender<LiveEvent>,
    known_subscribers: Mutex<HashSet<String>>,
}

impl BroadcastLiveBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        BroadcastLiveBus {
            sender,
            known_subscribers: Mutex::new(HashSet::new()),
        }
    }

    pub fn subscribe(&self, owner_id: &str) -> broadcast::Receiver<LiveEvent> {
        self.known_subscribers.lock().unwrap().insert(owner_id.to_string());
        self.sender.subscribe()
    }

    /// Call when a subscriber for `owner_id` disconnects, so `has_subscribers`
    /// stays accurate. The broadcast channel itself has no notion of "who is
    /// still listening to what", so this crate tracks it explicitly.
    pub fn unsubscribe(&self, owner_id: &str) {
        self.known_subscribers.lock().unwrap().remove(owner_id);
    }
}

impl LiveBus for BroadcastLiveBus {
    fn emit(&self, event: LiveEvent) {
        // Ignore send errors (no subscribers) — best-effort per §5.
        let _ = self.sender.send(event);
    }

    fn has_subscribers(&self, owner_id: &str) -> bool {
        self.known_subscribers.lock().unwrap().contains(owner_id)
    }
}

/// Test/embedding double that records every event without any channel.
#[derive(Default)]
pub struct NullLiveBus {
    pub events: Mutex<Vec<LiveEvent>>,
    pub subscribed_owners: Mutex<HashSet<String>>,
}

impl LiveBus for NullLiveBus {
    fn emit(&self, event: LiveEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn has_subscribers(&self, owner_id: &str) -> bool {
        self.subscribed_owners.lock().unwrap().contains(owner_id)
    }
}
