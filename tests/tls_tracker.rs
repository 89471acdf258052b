use std::sync::Arc;

use pulsewatch::model::{HttpMethod, HttpProbeConfig, Monitor, ProbeConfig, TlsCertEntry, TlsInfo};
use pulsewatch::{RecordingNotifier, Repository, SqliteRepository, TlsTracker};

fn http_monitor(expiry_notification: bool) -> Monitor {
    Monitor {
        id: "m1".into(),
        owner_id: "owner1".into(),
        name: "example".into(),
        interval_secs: 60,
        retry_interval_secs: 0,
        resend_interval_beats: 0,
        max_retries: 0,
        timeout_secs: 10.0,
        upside_down: false,
        active: true,
        parent_id: None,
        expiry_notification,
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

fn chain(days_remaining: i64, fingerprint: &str) -> TlsInfo {
    TlsInfo {
        monitor_id: "m1".into(),
        chain: vec![TlsCertEntry {
            subject_cn: "example.invalid".into(),
            cert_type: "server".into(),
            fingerprint256: fingerprint.into(),
            days_remaining,
            valid: true,
            issuer_certificate: None,
        }],
    }
}

#[tokio::test]
async fn crossing_two_thresholds_at_once_sends_both_notifications() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let tracker = TlsTracker::new(repo);
    let notifier = RecordingNotifier::default();
    let monitor = http_monitor(true);

    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(10, "fp-a")).await.unwrap();

    // days_remaining=10 clears both the 14- and 21-day marks in the same
    // probe; each is a distinct threshold and owed its own notification.
    assert_eq!(notifier.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn later_tick_sends_again_once_a_nearer_threshold_is_crossed() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let tracker = TlsTracker::new(repo);
    let notifier = RecordingNotifier::default();
    let monitor = http_monitor(true);

    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(10, "fp-a")).await.unwrap();
    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(5, "fp-a")).await.unwrap();

    // First tick fires at 14 and 21; the second tick additionally crosses
    // the nearer 7-day mark and fires once more.
    assert_eq!(notifier.sent.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn does_not_resend_same_threshold_same_fingerprint() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let tracker = TlsTracker::new(repo);
    let notifier = RecordingNotifier::default();
    let monitor = http_monitor(true);

    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(10, "fp-a")).await.unwrap();
    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(10, "fp-a")).await.unwrap();

    // Second tick crosses nothing new; count stays at the two from the
    // first tick.
    assert_eq!(notifier.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn fingerprint_rotation_resets_dedup() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let tracker = TlsTracker::new(repo);
    let notifier = RecordingNotifier::default();
    let monitor = http_monitor(true);

    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(10, "fp-a")).await.unwrap();
    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(10, "fp-b")).await.unwrap();

    // The fingerprint change clears the monitor's dedup history, so the
    // rotated cert earns both of its thresholds again.
    assert_eq!(notifier.sent.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn expiry_notification_flag_gates_sending() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let tracker = TlsTracker::new(repo);
    let notifier = RecordingNotifier::default();
    let monitor = http_monitor(false);

    tracker.handle_tls_info(&monitor, &[7, 14, 21], &notifier, chain(1, "fp-a")).await.unwrap();

    assert!(notifier.sent.lock().unwrap().is_empty());
}
