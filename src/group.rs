//! Group aggregation (§4.6) — a group monitor's status is derived from its
//! children's latest heartbeats rather than probed directly. Grounded in the
//! teacher's `consensus.rs` aggregation-over-children pattern, simplified
//! from multi-location consensus voting down to single-parent rollup.

use chrono::Utc;

use crate::error::CoreResult;
use crate::model::{Heartbeat, Status};
use crate::repository::Repository;

const GROUP_EMPTY_MSG: &str = "Group empty";
const CHILD_INACCESSIBLE_MSG: &str = "Child inaccessible";
const ALL_UP_MSG: &str = "All children up and running";

/// Rolls a group's children's latest heartbeats into one status for the
/// group itself (§4.6):
/// - no children, or no child has ever reported a heartbeat → PENDING,
///   `"Group empty"`.
/// - children with no heartbeat at all are skipped, not counted as DOWN.
/// - otherwise, worst-child degradation: start from UP; any reporting
///   child PENDING degrades the group to PENDING; any child DOWN degrades
///   the group to DOWN outright (DOWN always wins, regardless of order).
///   MAINTENANCE counts the same as UP, matching uptime accounting (§4.8).
pub async fn aggregate_group_status(repository: &dyn Repository, parent_id: &str) -> CoreResult<(Status, String)> {
    let children = repository.list_children(parent_id).await?;
    if children.is_empty() {
        return Ok((Status::Pending, GROUP_EMPTY_MSG.to_string()));
    }

    let mut latest: Vec<Heartbeat> = Vec::new();
    for child_id in &children {
        if let Some(beat) = repository.find_latest_heartbeat(child_id).await? {
            latest.push(beat);
        }
    }

    if latest.is_empty() {
        return Ok((Status::Pending, GROUP_EMPTY_MSG.to_string()));
    }

    let mut status = Status::Up;
    for beat in &latest {
        match beat.status {
            Status::Down => status = Status::Down,
            Status::Pending if status != Status::Down => status = Status::Pending,
            _ => {}
        }
    }

    let msg = if status == Status::Up { ALL_UP_MSG.to_string() } else { CHILD_INACCESSIBLE_MSG.to_string() };
    Ok((status, msg))
}

pub fn group_heartbeat(monitor_id: &str, status: Status, msg: String) -> Heartbeat {
    Heartbeat {
        id: uuid::Uuid::new_v4().to_string(),
        monitor_id: monitor_id.to_string(),
        time: Utc::now(),
        status,
        msg,
        ping: None,
        duration_secs: 0,
        important: false,
        down_count: 0,
    }
}
