use std::sync::Arc;

use chrono::{Duration, Utc};
use pulsewatch::{Heartbeat, Repository, SqliteRepository, Status, UptimeAggregator};

fn beat(monitor_id: &str, time: chrono::DateTime<Utc>, status: Status, ping: Option<i64>) -> Heartbeat {
    beat_with_duration(monitor_id, time, status, ping, 60)
}

fn beat_with_duration(monitor_id: &str, time: chrono::DateTime<Utc>, status: Status, ping: Option<i64>, duration_secs: i64) -> Heartbeat {
    Heartbeat {
        id: uuid::Uuid::new_v4().to_string(),
        monitor_id: monitor_id.to_string(),
        time,
        status,
        msg: String::new(),
        ping,
        duration_secs,
        important: false,
        down_count: 0,
    }
}

#[tokio::test]
async fn empty_history_is_zero_ratio_not_error() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let agg = UptimeAggregator::new(repo);
    let snap = agg.uptime("absent", 24).await.unwrap();
    assert_eq!(snap.ratio, 0.0);
    assert!(snap.avg_ping.is_none());
}

#[tokio::test]
async fn all_up_gives_ratio_one_and_averages_ping() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let now = Utc::now();
    repo.append_heartbeat(&beat("m1", now - Duration::minutes(30), Status::Up, Some(10)))
        .await
        .unwrap();
    repo.append_heartbeat(&beat("m1", now - Duration::minutes(10), Status::Up, Some(20)))
        .await
        .unwrap();

    let agg = UptimeAggregator::new(repo);
    let snap = agg.uptime("m1", 24).await.unwrap();
    assert_eq!(snap.ratio, 1.0);
    assert_eq!(snap.avg_ping, Some(15.0));
}

#[tokio::test]
async fn invalidate_clears_all_windows_for_monitor() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let now = Utc::now();
    repo.append_heartbeat(&beat("m1", now - Duration::minutes(30), Status::Up, Some(10)))
        .await
        .unwrap();

    let agg = UptimeAggregator::new(repo.clone());
    let before = agg.uptime("m1", 24).await.unwrap();
    agg.invalidate("m1");
    repo.append_heartbeat(&beat("m1", now - Duration::minutes(5), Status::Down, None))
        .await
        .unwrap();
    let after = agg.uptime("m1", 24).await.unwrap();

    assert!(after.ratio < before.ratio);
}

#[tokio::test]
async fn down_beats_reduce_ratio_proportionally() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let now = Utc::now();
    // Window is comfortably larger than either beat's own duration, so
    // neither gets clamped by `since` and the ratio is exactly 30min/60min.
    repo.append_heartbeat(&beat_with_duration("m1", now - Duration::minutes(60), Status::Down, None, 1800))
        .await
        .unwrap();
    repo.append_heartbeat(&beat_with_duration("m1", now - Duration::minutes(30), Status::Up, Some(5), 1800))
        .await
        .unwrap();

    let agg = UptimeAggregator::new(repo);
    let snap = agg.uptime("m1", 24).await.unwrap();
    assert!((snap.ratio - 0.5).abs() < 0.01);
}

#[tokio::test]
async fn single_fresh_up_beat_reports_ratio_one_not_zero() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let now = Utc::now();
    // First-ever heartbeat for this monitor: duration_secs is 0 since there
    // was no previous beat to measure from, so total_duration in the window
    // is also 0 — the ratio must fall back to the latest beat's status.
    repo.append_heartbeat(&beat_with_duration("m1", now, Status::Up, Some(8), 0)).await.unwrap();

    let agg = UptimeAggregator::new(repo);
    let snap = agg.uptime("m1", 24).await.unwrap();
    assert_eq!(snap.ratio, 1.0);
}
