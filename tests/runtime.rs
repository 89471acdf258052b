use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use pulsewatch::model::{HttpMethod, HttpProbeConfig, MaintenanceWindow, Monitor, ProbeConfig};
use pulsewatch::{
    CoreResult, Env, InMemoryMetricsSink, MonitorRuntime, NullLiveBus, ProbeContext, ProbeDriver, ProbeOutcome, ProbeRegistry,
    RecordingNotifier, RecordingPreCommandRunner, Repository, RuntimeDeps, SqliteRepository, Status, TlsTracker,
};

/// Returns a fixed status on every call, counting invocations.
struct ScriptedDriver {
    statuses: Mutex<Vec<Status>>,
    calls: AtomicUsize,
}

impl ScriptedDriver {
    fn new(statuses: Vec<Status>) -> Self {
        ScriptedDriver {
            statuses: Mutex::new(statuses),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProbeDriver for ScriptedDriver {
    async fn probe(&self, _monitor: &Monitor, _ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 { statuses.remove(0) } else { *statuses.first().unwrap() };
        Ok(ProbeOutcome {
            status,
            msg: "scripted".to_string(),
            ping_ms: Some(5),
            tls_info: None,
        })
    }
}

fn http_monitor(id: &str) -> Monitor {
    Monitor {
        id: id.to_string(),
        owner_id: "owner1".into(),
        name: "example".into(),
        interval_secs: 60,
        retry_interval_secs: 5,
        resend_interval_beats: 0,
        max_retries: 1,
        timeout_secs: 5.0,
        upside_down: false,
        active: true,
        parent_id: None,
        expiry_notification: false,
        pre_up_command: None,
        pre_down_command: None,
        notification_providers: vec!["webhook:https://example.invalid/hook".into()],
        probe: ProbeConfig::Http(HttpProbeConfig {
            url: "https://example.invalid".into(),
            method: HttpMethod::Get,
            headers: Default::default(),
            body: None,
            accepted_status: Default::default(),
            max_redirects: 0,
            ignore_tls: false,
            auth: Default::default(),
            proxy: None,
            check_content_parameter: false,
        }),
    }
}

struct Harness {
    runtime: MonitorRuntime,
    notifier: Arc<RecordingNotifier>,
    precommand: Arc<RecordingPreCommandRunner>,
    repository: Arc<dyn Repository>,
}

fn harness(monitor: Monitor, driver: Arc<dyn ProbeDriver>) -> Harness {
    let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let probes = Arc::new(ProbeRegistry::builder().register(monitor.monitor_type(), driver).build());
    let notifier = Arc::new(RecordingNotifier::default());
    let precommand = Arc::new(RecordingPreCommandRunner::default());
    let live_bus = Arc::new(NullLiveBus::default());
    let metrics = Arc::new(InMemoryMetricsSink::new());
    let tls_tracker = Arc::new(TlsTracker::new(repository.clone()));
    let uptime = Arc::new(pulsewatch::UptimeAggregator::new(repository.clone()));

    let deps = Arc::new(RuntimeDeps {
        repository: repository.clone(),
        probes,
        notifier: notifier.clone(),
        precommand: precommand.clone(),
        live_bus,
        metrics,
        tls_tracker,
        uptime,
    });

    Harness {
        runtime: MonitorRuntime::new(monitor, deps),
        notifier,
        precommand,
        repository,
    }
}

#[tokio::test]
async fn first_up_beat_notifies_and_persists() {
    let driver = Arc::new(ScriptedDriver::new(vec![Status::Up]));
    let h = harness(http_monitor("m1"), driver);
    let env = Arc::new(Env::default());

    h.runtime.tick(&env).await.unwrap();

    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    let beat = h.repository.find_latest_heartbeat("m1").await.unwrap().unwrap();
    assert_eq!(beat.status, Status::Up);
    assert!(beat.important);
}

#[tokio::test]
async fn down_beat_within_max_retries_downgrades_to_pending_without_notifying() {
    let driver = Arc::new(ScriptedDriver::new(vec![Status::Up, Status::Down]));
    let h = harness(http_monitor("m1"), driver);
    let env = Arc::new(Env::default());

    h.runtime.tick(&env).await.unwrap(); // first beat, up
    h.runtime.tick(&env).await.unwrap(); // probe reports down, but max_retries=1 downgrades to pending

    let beat = h.repository.find_latest_heartbeat("m1").await.unwrap().unwrap();
    assert_eq!(beat.status, Status::Pending);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1); // only the first-beat notification
}

#[tokio::test]
async fn sustained_down_past_retries_notifies_and_runs_precommand() {
    let mut monitor = http_monitor("m1");
    monitor.pre_down_command = Some("true".to_string());
    let driver = Arc::new(ScriptedDriver::new(vec![Status::Up, Status::Down, Status::Down]));
    let h = harness(monitor, driver);
    let env = Arc::new(Env::default());

    h.runtime.tick(&env).await.unwrap(); // up
    h.runtime.tick(&env).await.unwrap(); // down -> pending (retry budget)
    h.runtime.tick(&env).await.unwrap(); // down again -> retries exhausted, real down

    let beat = h.repository.find_latest_heartbeat("m1").await.unwrap().unwrap();
    assert_eq!(beat.status, Status::Down);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 2);
    assert_eq!(h.precommand.runs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn maintenance_window_overrides_probe_result() {
    // Scripted driver reports Up first (establishing a non-first prior beat),
    // then the monitor enters maintenance for the second tick.
    let driver = Arc::new(ScriptedDriver::new(vec![Status::Up, Status::Down]));
    let h = harness(http_monitor("m1"), driver);
    let env = Arc::new(Env::default());

    h.runtime.tick(&env).await.unwrap(); // first beat, up, not under maintenance
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);

    let now = Utc::now();
    h.repository
        .add_maintenance_window(&MaintenanceWindow {
            id: "w1".into(),
            monitor_id: "m1".into(),
            starts_at: now - chrono::Duration::minutes(1),
            ends_at: now + chrono::Duration::minutes(1),
        })
        .await
        .unwrap();

    h.runtime.tick(&env).await.unwrap();

    let beat = h.repository.find_latest_heartbeat("m1").await.unwrap().unwrap();
    assert_eq!(beat.status, Status::Maintenance);
    assert_eq!(beat.msg, "Monitor under maintenance");
    assert!(beat.important);
    // Up -> Maintenance is important but not important_for_notify (§4.3).
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn expired_maintenance_window_does_not_suppress_probe() {
    let driver = Arc::new(ScriptedDriver::new(vec![Status::Down]));
    let h = harness(http_monitor("m1"), driver);
    let now = Utc::now();

    h.repository
        .add_maintenance_window(&MaintenanceWindow {
            id: "w1".into(),
            monitor_id: "m1".into(),
            starts_at: now - chrono::Duration::hours(2),
            ends_at: now - chrono::Duration::hours(1),
        })
        .await
        .unwrap();

    let env = Arc::new(Env::default());
    h.runtime.tick(&env).await.unwrap();

    let beat = h.repository.find_latest_heartbeat("m1").await.unwrap().unwrap();
    assert_eq!(beat.status, Status::Down);
}
