//! Steam game-server driver (§4.5) — queries the Steam master/A2S info
//! protocol through the same `gamedig`-style query the generic GameDig
//! driver uses, pinned to the `"steam"` query type since Steam servers have
//! their own historical monitor type in the original source.

use std::time::Instant;

use async_trait::async_trait;
use gamedig::games::valve;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct SteamDriver;

#[async_trait]
impl ProbeDriver for SteamDriver {
    async fn probe(&self, monitor: &Monitor, _ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Steam(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a steam probe".into()));
        };

        let host = config.host.clone();
        let port = config.port;
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || valve::query(&host, Some(port)))
            .await
            .map_err(|e| CoreError::Network(format!("steam query task panicked: {e}")))?;

        match result {
            Ok(response) => Ok(ProbeOutcome::up(format!("{} - {} players", response.name, response.players_online)).with_ping(start.elapsed().as_millis() as i64)),
            Err(e) => Ok(ProbeOutcome::down(format!("{}:{} - {e}", config.host, config.port))),
        }
    }
}
