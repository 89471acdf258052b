//! Generic GameDig driver (§4.5) — queries an arbitrary game server query
//! protocol by id, the way the teacher's Steam-only check is generalized to
//! the dozens of query types the `gamedig` crate supports.

use std::time::Instant;

use async_trait::async_trait;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct GameDigDriver;

#[async_trait]
impl ProbeDriver for GameDigDriver {
    async fn probe(&self, monitor: &Monitor, _ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::GameDig(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a gamedig probe".into()));
        };

        let game_id = config.game_id.clone();
        let host = config.host.clone();
        let port = config.port;

        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || gamedig::query(&game_id, &host, Some(port)))
            .await
            .map_err(|e| CoreError::Network(format!("gamedig query task panicked: {e}")))?;

        match result {
            Ok(response) => Ok(ProbeOutcome::up(format!("{} - {} players", response.name, response.players_online)).with_ping(start.elapsed().as_millis() as i64)),
            Err(e) => Ok(ProbeOutcome::down(format!("{}:{} ({}) - {e}", config.host, config.port, config.game_id))),
        }
    }
}
