//! TLS Tracker (§4.7) — certificate capture, fingerprint diffing, and
//! expiry-window notification dedup.
//!
//! Certificate chain capture itself (the rustls handshake against the probed
//! host:port) lives in `probes::http`; this module owns what happens once a
//! chain has been captured: persisting it, detecting rotation, and deciding
//! which expiry notifications are still owed.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::model::{Monitor, TlsInfo};
use crate::notifier::{build_message, NotificationPayload, Notifier};
use crate::repository::Repository;

const NOTIFICATION_KIND: &str = "certificate";

pub struct TlsTracker {
    repository: Arc<dyn Repository>,
    known_root_fingerprints: HashSet<String>,
}

impl TlsTracker {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        TlsTracker {
            repository,
            known_root_fingerprints: HashSet::new(),
        }
    }

    pub fn with_known_roots(mut self, fingerprints: impl IntoIterator<Item = String>) -> Self {
        self.known_root_fingerprints.extend(fingerprints);
        self
    }

    /// §4.7: upsert, detect rotation, evaluate expiry thresholds, notify.
    /// Returns the stored `TlsInfo` so the caller can hand it to MetricsSink
    /// and LiveBus (the outer, persisted copy is authoritative — §11).
    pub async fn handle_tls_info(
        &self,
        monitor: &Monitor,
        tls_expiry_notify_days: &[u32],
        notifier: &dyn Notifier,
        new_info: TlsInfo,
    ) -> CoreResult<TlsInfo> {
        let previous = self.repository.find_tls_info(&monitor.id).await?;
        let fingerprint_changed = match (&previous, new_info.leaf()) {
            (Some(prev), Some(new_leaf)) => prev.leaf().map(|c| c.fingerprint256.as_str()) != Some(new_leaf.fingerprint256.as_str()),
            (None, Some(_)) => false, // first observation — nothing to diff against
            _ => false,
        };

        self.repository.upsert_tls_info(&new_info).await?;

        if fingerprint_changed {
            self.repository.clear_notification_sent(NOTIFICATION_KIND, &monitor.id).await?;
        }

        if !monitor.expiry_notification {
            return Ok(new_info);
        }

        for cert in &new_info.chain {
            if self.known_root_fingerprints.contains(&cert.fingerprint256) {
                continue;
            }
            // Largest threshold first: `has_notification_sent` matches
            // `days <= threshold`, so recording the nearer threshold first
            // would make it look like the farther one was already covered
            // and swallow a notification that's separately owed.
            let mut thresholds: Vec<u32> = tls_expiry_notify_days.to_vec();
            thresholds.sort_unstable_by(|a, b| b.cmp(a));
            for threshold in thresholds {
                if cert.days_remaining > threshold as i64 {
                    continue;
                }
                if self
                    .repository
                    .has_notification_sent(NOTIFICATION_KIND, &monitor.id, threshold)
                    .await?
                {
                    continue;
                }

                let text = format!(
                    "[{}][{}] {} certificate {} will be expired in {} days",
                    monitor.name,
                    monitor_url_for_message(monitor),
                    cert.cert_type,
                    cert.subject_cn,
                    cert.days_remaining
                );
                let payload = cert_expiry_payload(monitor, &text);
                for provider in &monitor.notification_providers {
                    if let Err(err) = notifier.send(provider, &payload).await {
                        tracing::warn!(monitor_id = %monitor.id, provider, error = %err, "cert-expiry notification failed");
                    }
                }
                self.repository
                    .record_notification_sent(NOTIFICATION_KIND, &monitor.id, threshold)
                    .await?;
            }
        }

        Ok(new_info)
    }
}

fn monitor_url_for_message(monitor: &Monitor) -> String {
    if let crate::model::ProbeConfig::Http(http) = &monitor.probe {
        http.url.clone()
    } else {
        monitor.name.clone()
    }
}

fn cert_expiry_payload(monitor: &Monitor, text: &str) -> NotificationPayload {
    use chrono::Utc;

    use crate::model::{Heartbeat, Status};

    let now = Utc::now();
    NotificationPayload {
        monitor_id: monitor.id.clone(),
        monitor_name: monitor.name.clone(),
        status: Status::Up,
        message: build_message(&monitor.name, Status::Up, text),
        heartbeat: Heartbeat {
            id: uuid::Uuid::new_v4().to_string(),
            monitor_id: monitor.id.clone(),
            time: now,
            status: Status::Up,
            msg: text.to_string(),
            ping: None,
            duration_secs: 0,
            important: false,
            down_count: 0,
        },
        server_timezone: "UTC".to_string(),
        server_timezone_offset: "+00:00".to_string(),
        localized_timestamp: now.to_rfc3339(),
    }
}
