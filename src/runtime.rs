//! Monitor Runtime (§4.2, §4.4) — the per-monitor beat loop. Grounded in the
//! teacher's `checker.rs`, which owns this same responsibility end-to-end
//! (normalize → probe → classify → notify → persist → reschedule) but
//! inline in one big async function; here it's split into the collaborator
//! traits this module threads together (ProbeRegistry, Repository,
//! Notifier, PreCommandRunner, LiveBus, MetricsSink, TlsTracker,
//! UptimeAggregator) so each can be faked independently in tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::classifier::{is_important, is_important_for_notify};
use crate::env::Env;
use crate::error::{CoreError, CoreResult};
use crate::live_bus::{LiveBus, LiveEvent};
use crate::metrics::MetricsSink;
use crate::model::{Heartbeat, Monitor, MonitorType, Status};
use crate::notifier::{build_message, NotificationPayload, Notifier};
use crate::precommand::PreCommandRunner;
use crate::probes::{ProbeContext, ProbeOutcome, ProbeRegistry};
use crate::repository::Repository;
use crate::tls_tracker::TlsTracker;
use crate::uptime::UptimeAggregator;

/// Collaborators a [`MonitorRuntime`] depends on. Grouped into one struct so
/// a supervisor can build it once and hand an `Arc` to every monitor task.
pub struct RuntimeDeps {
    pub repository: Arc<dyn Repository>,
    pub probes: Arc<ProbeRegistry>,
    pub notifier: Arc<dyn Notifier>,
    pub precommand: Arc<dyn PreCommandRunner>,
    pub live_bus: Arc<dyn LiveBus>,
    pub metrics: Arc<dyn MetricsSink>,
    pub tls_tracker: Arc<TlsTracker>,
    pub uptime: Arc<UptimeAggregator>,
}

/// Per-monitor runtime state carried between ticks: `previous_beat`,
/// `retries`, and the cancellation token governing this monitor's loop
/// (§4.2, §5).
pub struct MonitorRuntime {
    monitor: Monitor,
    deps: Arc<RuntimeDeps>,
    retries: AtomicU32,
    cancellation: CancellationToken,
}

impl MonitorRuntime {
    pub fn new(monitor: Monitor, deps: Arc<RuntimeDeps>) -> Self {
        MonitorRuntime {
            monitor,
            deps,
            retries: AtomicU32::new(0),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Spawns the beat loop as an independent task (§5). Consumes `self`
    /// behind an `Arc` so the supervisor can still query `monitor_id`/stop it.
    pub fn spawn(self: Arc<Self>, env: Arc<Env>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if self.monitor.monitor_type() == MonitorType::Push {
                tokio::select! {
                    _ = tokio::time::sleep(StdDuration::from_secs(self.monitor.interval_secs as u64)) => {}
                    _ = self.cancellation.cancelled() => return,
                }
            }

            loop {
                if self.cancellation.is_cancelled() {
                    return;
                }

                let delay = match self.tick(&env).await {
                    Ok(delay) => delay,
                    Err(err) => {
                        tracing::error!(monitor_id = %self.monitor.id, error = %err, "tick panicked past its safety shell, rescheduling at base interval");
                        StdDuration::from_secs(self.monitor.interval_secs.max(1) as u64)
                    }
                };

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancellation.cancelled() => return,
                }
            }
        })
    }

    /// One beat: steps 1-11 of §4.2. Returns the delay until the next tick.
    pub async fn tick(&self, env: &Arc<Env>) -> CoreResult<StdDuration> {
        // Step 1: normalize.
        let beat_interval = env.normalize_interval(self.monitor.interval_secs);
        let timeout_secs = if self.monitor.timeout_secs <= 0.0 {
            beat_interval as f64 * 0.8
        } else {
            self.monitor.timeout_secs
        };

        // Step 2: load previous beat.
        let previous_beat = self.deps.repository.find_latest_heartbeat(&self.monitor.id).await?;
        let is_first_beat = previous_beat.is_none();
        let now = Utc::now();

        // Step 3: compose skeleton.
        let duration_secs = previous_beat.as_ref().map(|p| (now - p.time).num_seconds().max(0)).unwrap_or(0);
        let down_count = previous_beat.as_ref().map(|p| p.down_count).unwrap_or(0);

        // Step 4: maintenance check.
        let maintenances = self.deps.repository.list_active_maintenances(&self.monitor.id, now).await?;
        let under_maintenance = maintenances.iter().any(|m| m.is_active_at(now));

        let (status, msg, ping_ms, tls_info) = if under_maintenance {
            (Status::Maintenance, "Monitor under maintenance".to_string(), None, None)
        } else {
            self.probe_and_classify(timeout_secs, env).await
        };

        let beat = Heartbeat {
            id: Uuid::new_v4().to_string(),
            monitor_id: self.monitor.id.clone(),
            time: now,
            status,
            msg,
            ping: ping_ms,
            duration_secs,
            important: false,
            down_count,
        };

        let beat = self.classify_and_dispatch(beat, previous_beat.as_ref().map(|p| p.status), is_first_beat).await?;

        if let Some(tls_info) = tls_info {
            self.deps.tls_tracker.handle_tls_info(&self.monitor, &env.tls_expiry_notify_days, self.deps.notifier.as_ref(), tls_info).await?;
        }

        // Step 9: publish.
        self.deps.uptime.invalidate(&self.monitor.id);
        self.deps.live_bus.emit(LiveEvent::Heartbeat {
            owner_id: self.monitor.owner_id.clone(),
            heartbeat: beat.clone(),
        });
        if self.deps.live_bus.has_subscribers(&self.monitor.owner_id) {
            self.publish_stats().await;
        }

        // Step 10: persist.
        self.deps.repository.append_heartbeat(&beat).await?;
        self.deps.metrics.observe_heartbeat(&beat);

        // Step 11: schedule next tick.
        let delay_secs = if beat.status == Status::Pending && self.monitor.retry_interval_secs > 0 {
            self.monitor.retry_interval_secs
        } else {
            beat_interval
        };
        Ok(StdDuration::from_secs(delay_secs as u64))
    }

    /// Steps 5-7: dispatch to the probe driver, apply upside-down inversion,
    /// and run retry accounting, collapsing everything into one `(status,
    /// msg, ping, tls_info)` tuple for the beat skeleton.
    async fn probe_and_classify(&self, timeout_secs: f64, env: &Arc<Env>) -> (Status, String, Option<i64>, Option<crate::model::TlsInfo>) {
        let timeout = StdDuration::from_secs_f64(timeout_secs.max(0.001));
        let probe_cancellation = self.cancellation.child_token();
        let abort_timer = tokio::time::sleep(timeout + StdDuration::from_secs_f64(crate::env::PROBE_ABORT_PADDING_SECS));

        let ctx = ProbeContext {
            repository: self.deps.repository.clone(),
            env: env.clone(),
            timeout,
            cancellation: probe_cancellation.clone(),
        };

        let outcome_result = if self.monitor.monitor_type() == MonitorType::Group {
            self.group_probe().await
        } else {
            let Some(driver) = self.deps.probes.get(self.monitor.monitor_type()) else {
                return (Status::Down, "Unknown Monitor Type".to_string(), None, None);
            };
            tokio::select! {
                result = driver.probe(&self.monitor, &ctx) => result,
                _ = abort_timer => Err(CoreError::Cancelled(timeout_secs)),
            }
        };

        match outcome_result {
            Ok(ProbeOutcome { status, msg, ping_ms, tls_info }) => {
                let status = self.apply_upside_down(status);
                self.record_probe_result(status != Status::Down);
                (status, msg, ping_ms, tls_info)
            }
            Err(err) => {
                self.record_probe_result(false);
                (Status::Down, err.beat_message(), None, None)
            }
        }
    }

    async fn group_probe(&self) -> CoreResult<ProbeOutcome> {
        let (status, msg) = crate::group::aggregate_group_status(self.deps.repository.as_ref(), &self.monitor.id).await?;
        Ok(ProbeOutcome {
            status,
            msg,
            ping_ms: None,
            tls_info: None,
        })
    }

    /// Step 6: flips UP<->DOWN for `upside_down` monitors. PENDING and
    /// MAINTENANCE pass through unchanged (only a binary probe outcome is
    /// invertible).
    fn apply_upside_down(&self, status: Status) -> Status {
        if !self.monitor.upside_down {
            return status;
        }
        match status {
            Status::Up => Status::Down,
            Status::Down => Status::Up,
            other => other,
        }
    }

    /// Step 7: retry accounting. `success` means the post-inversion status
    /// was not DOWN.
    fn record_probe_result(&self, success: bool) {
        if success {
            self.retries.store(0, Ordering::SeqCst);
        }
    }

    /// Applies retry-driven PENDING downgrade, runs the transition
    /// classifier (§4.3), dispatches pre-command/notifications, and returns
    /// the finished beat (steps 7b-8).
    async fn classify_and_dispatch(&self, mut beat: Heartbeat, prev_status: Option<Status>, is_first_beat: bool) -> CoreResult<Heartbeat> {
        if beat.status == Status::Down {
            let retries = self.retries.load(Ordering::SeqCst);
            if retries < self.monitor.max_retries {
                self.retries.store(retries + 1, Ordering::SeqCst);
                beat.status = Status::Pending;
            }
        }

        let important = is_important(is_first_beat, prev_status, beat.status);
        let important_for_notify = is_important_for_notify(is_first_beat, prev_status, beat.status);
        beat.important = important;

        if important_for_notify {
            self.run_precommand_and_notify(beat.status, &beat).await;
            beat.down_count = 0;
        } else if beat.status == Status::Down && self.monitor.resend_interval_beats > 0 {
            beat.down_count += 1;
            if beat.down_count >= self.monitor.resend_interval_beats {
                self.run_precommand_and_notify(beat.status, &beat).await;
                beat.down_count = 0;
            }
        }

        Ok(beat)
    }

    /// §4.9: pre-command then notification fan-out. Failures in either are
    /// logged only — never abort the tick (§7).
    async fn run_precommand_and_notify(&self, status: Status, beat: &Heartbeat) {
        if let Some(command) = self.pre_command_for(status) {
            if let Err(err) = self.deps.precommand.run(status, &self.monitor.public_json(), command).await {
                tracing::warn!(monitor_id = %self.monitor.id, error = %err, "pre-command failed");
            }
        }

        let payload = self.notification_payload(status, beat);
        for provider in &self.monitor.notification_providers {
            if let Err(err) = self.deps.notifier.send(provider, &payload).await {
                tracing::warn!(monitor_id = %self.monitor.id, provider, error = %err, "notification dispatch failed");
            }
        }
    }

    fn pre_command_for(&self, status: Status) -> Option<&str> {
        match status {
            Status::Up => self.monitor.pre_up_command.as_deref(),
            Status::Down => self.monitor.pre_down_command.as_deref(),
            _ => None,
        }
    }

    fn notification_payload(&self, status: Status, beat: &Heartbeat) -> NotificationPayload {
        let now = Utc::now();
        NotificationPayload {
            monitor_id: self.monitor.id.clone(),
            monitor_name: self.monitor.name.clone(),
            status,
            message: build_message(&self.monitor.name, status, &beat.msg),
            heartbeat: beat.clone(),
            server_timezone: "UTC".to_string(),
            server_timezone_offset: "+00:00".to_string(),
            localized_timestamp: now.to_rfc3339(),
        }
    }

    /// Step 9 stats fan-out: only computed when someone is listening (§5).
    async fn publish_stats(&self) {
        for window_hours in [24u32, 720u32] {
            if let Ok(snapshot) = self.deps.uptime.uptime(&self.monitor.id, window_hours).await {
                self.deps.live_bus.emit(LiveEvent::Uptime {
                    owner_id: self.monitor.owner_id.clone(),
                    monitor_id: self.monitor.id.clone(),
                    window_hours,
                    ratio: snapshot.ratio,
                });
                if window_hours == 24 {
                    self.deps.live_bus.emit(LiveEvent::AvgPing {
                        owner_id: self.monitor.owner_id.clone(),
                        monitor_id: self.monitor.id.clone(),
                        window_hours,
                        avg_ms: snapshot.avg_ping,
                    });
                }
            }
        }
    }
}

