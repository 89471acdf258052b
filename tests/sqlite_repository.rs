use chrono::{Duration, Utc};
use pulsewatch::model::{MaintenanceWindow, TlsCertEntry, TlsInfo};
use pulsewatch::{Heartbeat, Repository, SqliteRepository, Status};

fn beat(monitor_id: &str, status: Status) -> Heartbeat {
    Heartbeat {
        id: uuid::Uuid::new_v4().to_string(),
        monitor_id: monitor_id.to_string(),
        time: Utc::now(),
        status,
        msg: "probed".to_string(),
        ping: Some(12),
        duration_secs: 30,
        important: true,
        down_count: 0,
    }
}

fn open_temp() -> (tempfile::TempDir, SqliteRepository) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulsewatch.db");
    let repo = SqliteRepository::open(path.to_str().unwrap()).unwrap();
    (dir, repo)
}

#[tokio::test]
async fn heartbeat_roundtrips_and_orders_by_recency() {
    let (_dir, repo) = open_temp();
    repo.append_heartbeat(&beat("m1", Status::Up)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = beat("m1", Status::Down);
    repo.append_heartbeat(&second).await.unwrap();

    let latest = repo.find_latest_heartbeat("m1").await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(latest.status, Status::Down);
    assert_eq!(latest.ping, Some(12));
}

#[tokio::test]
async fn heartbeats_since_excludes_older_entries() {
    let (_dir, repo) = open_temp();
    let now = Utc::now();
    let mut old = beat("m1", Status::Up);
    old.time = now - Duration::hours(2);
    repo.append_heartbeat(&old).await.unwrap();
    let mut recent = beat("m1", Status::Up);
    recent.time = now - Duration::minutes(5);
    repo.append_heartbeat(&recent).await.unwrap();

    let since = now - Duration::hours(1);
    let beats = repo.heartbeats_since("m1", since).await.unwrap();
    assert_eq!(beats.len(), 1);
    assert_eq!(beats[0].id, recent.id);
}

#[tokio::test]
async fn group_parent_child_relationship_persists() {
    let (_dir, repo) = open_temp();
    repo.set_parent("child1", "group1").await.unwrap();
    repo.set_parent("child2", "group1").await.unwrap();

    let mut children = repo.list_children("group1").await.unwrap();
    children.sort();
    assert_eq!(children, vec!["child1".to_string(), "child2".to_string()]);

    // Re-parenting updates in place rather than duplicating rows.
    repo.set_parent("child1", "group2").await.unwrap();
    let group1_children = repo.list_children("group1").await.unwrap();
    assert_eq!(group1_children, vec!["child2".to_string()]);
}

#[tokio::test]
async fn maintenance_window_only_returned_while_active() {
    let (_dir, repo) = open_temp();
    let now = Utc::now();
    repo.add_maintenance_window(&MaintenanceWindow {
        id: "w1".into(),
        monitor_id: "m1".into(),
        starts_at: now - Duration::minutes(10),
        ends_at: now + Duration::minutes(10),
    })
    .await
    .unwrap();
    repo.add_maintenance_window(&MaintenanceWindow {
        id: "w2".into(),
        monitor_id: "m1".into(),
        starts_at: now - Duration::days(2),
        ends_at: now - Duration::days(1),
    })
    .await
    .unwrap();

    let active = repo.list_active_maintenances("m1", now).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "w1");
}

#[tokio::test]
async fn tls_info_upsert_replaces_previous_chain() {
    let (_dir, repo) = open_temp();
    let first = TlsInfo {
        monitor_id: "m1".into(),
        chain: vec![TlsCertEntry {
            subject_cn: "example.invalid".into(),
            cert_type: "server".into(),
            fingerprint256: "fp-a".into(),
            days_remaining: 30,
            valid: true,
            issuer_certificate: None,
        }],
    };
    repo.upsert_tls_info(&first).await.unwrap();
    let found = repo.find_tls_info("m1").await.unwrap().unwrap();
    assert_eq!(found.leaf().unwrap().fingerprint256, "fp-a");

    let second = TlsInfo {
        monitor_id: "m1".into(),
        chain: vec![TlsCertEntry {
            subject_cn: "example.invalid".into(),
            cert_type: "server".into(),
            fingerprint256: "fp-b".into(),
            days_remaining: 29,
            valid: true,
            issuer_certificate: None,
        }],
    };
    repo.upsert_tls_info(&second).await.unwrap();
    let found = repo.find_tls_info("m1").await.unwrap().unwrap();
    assert_eq!(found.leaf().unwrap().fingerprint256, "fp-b");
}

#[tokio::test]
async fn notification_dedup_tracks_per_kind_and_threshold() {
    let (_dir, repo) = open_temp();
    assert!(!repo.has_notification_sent("certificate", "m1", 14).await.unwrap());

    repo.record_notification_sent("certificate", "m1", 14).await.unwrap();
    assert!(repo.has_notification_sent("certificate", "m1", 14).await.unwrap());
    assert!(repo.has_notification_sent("certificate", "m1", 21).await.unwrap()); // recorded 14 <= queried 21
    assert!(!repo.has_notification_sent("certificate", "m1", 7).await.unwrap()); // recorded 14 > queried 7

    repo.clear_notification_sent("certificate", "m1").await.unwrap();
    assert!(!repo.has_notification_sent("certificate", "m1", 14).await.unwrap());
}

#[tokio::test]
async fn settings_roundtrip_and_overwrite() {
    let (_dir, repo) = open_temp();
    assert_eq!(repo.get_setting("timezone").await.unwrap(), None);

    repo.set_setting("timezone", "America/New_York", "default").await.unwrap();
    assert_eq!(repo.get_setting("timezone").await.unwrap(), Some("America/New_York".to_string()));

    repo.set_setting("timezone", "UTC", "default").await.unwrap();
    assert_eq!(repo.get_setting("timezone").await.unwrap(), Some("UTC".to_string()));
}

#[tokio::test]
async fn dns_last_result_roundtrips() {
    let (_dir, repo) = open_temp();
    assert_eq!(repo.dns_last_result("m1").await.unwrap(), None);

    repo.persist_dns_last_result("m1", "1.2.3.4").await.unwrap();
    assert_eq!(repo.dns_last_result("m1").await.unwrap(), Some("1.2.3.4".to_string()));

    repo.persist_dns_last_result("m1", "1.2.3.5").await.unwrap();
    assert_eq!(repo.dns_last_result("m1").await.unwrap(), Some("1.2.3.5".to_string()));
}
