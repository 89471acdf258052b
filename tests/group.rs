use std::sync::Arc;

use chrono::Utc;
use pulsewatch::group::aggregate_group_status;
use pulsewatch::{Heartbeat, Repository, SqliteRepository, Status};

fn beat(monitor_id: &str, status: Status) -> Heartbeat {
    Heartbeat {
        id: uuid::Uuid::new_v4().to_string(),
        monitor_id: monitor_id.to_string(),
        time: Utc::now(),
        status,
        msg: String::new(),
        ping: None,
        duration_secs: 60,
        important: false,
        down_count: 0,
    }
}

#[tokio::test]
async fn group_with_no_children_is_pending() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let (status, msg) = aggregate_group_status(&*repo, "g1").await.unwrap();
    assert_eq!(status, Status::Pending);
    assert_eq!(msg, "Group empty");
}

#[tokio::test]
async fn children_with_no_heartbeat_yet_are_skipped() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    repo.set_parent("c1", "g1").await.unwrap();
    repo.set_parent("c2", "g1").await.unwrap();

    let (status, msg) = aggregate_group_status(&*repo, "g1").await.unwrap();
    assert_eq!(status, Status::Pending);
    assert_eq!(msg, "Group empty");
}

#[tokio::test]
async fn down_child_drags_group_down_even_with_an_up_sibling() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    repo.set_parent("c1", "g1").await.unwrap();
    repo.set_parent("c2", "g1").await.unwrap();
    repo.append_heartbeat(&beat("c1", Status::Down)).await.unwrap();
    repo.append_heartbeat(&beat("c2", Status::Up)).await.unwrap();

    let (status, msg) = aggregate_group_status(&*repo, "g1").await.unwrap();
    assert_eq!(status, Status::Down);
    assert_eq!(msg, "Child inaccessible");
}

#[tokio::test]
async fn pending_child_degrades_group_even_with_up_siblings() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    repo.set_parent("a", "g1").await.unwrap();
    repo.set_parent("b", "g1").await.unwrap();
    repo.set_parent("c", "g1").await.unwrap();
    repo.append_heartbeat(&beat("a", Status::Up)).await.unwrap();
    repo.append_heartbeat(&beat("b", Status::Pending)).await.unwrap();
    repo.append_heartbeat(&beat("c", Status::Up)).await.unwrap();

    let (status, msg) = aggregate_group_status(&*repo, "g1").await.unwrap();
    assert_eq!(status, Status::Pending);
    assert_eq!(msg, "Child inaccessible");
}

#[tokio::test]
async fn all_reporting_children_down_makes_group_down() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    repo.set_parent("c1", "g1").await.unwrap();
    repo.set_parent("c2", "g1").await.unwrap();
    repo.append_heartbeat(&beat("c1", Status::Down)).await.unwrap();
    repo.append_heartbeat(&beat("c2", Status::Down)).await.unwrap();

    let (status, msg) = aggregate_group_status(&*repo, "g1").await.unwrap();
    assert_eq!(status, Status::Down);
    assert_eq!(msg, "Child inaccessible");
}

#[tokio::test]
async fn maintenance_child_counts_as_up() {
    let repo: Arc<dyn Repository> = Arc::new(SqliteRepository::open_in_memory().unwrap());
    repo.set_parent("c1", "g1").await.unwrap();
    repo.append_heartbeat(&beat("c1", Status::Maintenance)).await.unwrap();

    let (status, msg) = aggregate_group_status(&*repo, "g1").await.unwrap();
    assert_eq!(status, Status::Up);
    assert_eq!(msg, "All children up and running");
}
