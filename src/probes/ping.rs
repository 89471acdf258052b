//! ICMP ping driver (§4.5). The teacher shells out to the system `ping`
//! binary and parses its stdout; this crate uses `surge-ping` instead so the
//! probe doesn't depend on a particular OS's `ping` output format.

use std::time::Instant;

use async_trait::async_trait;
use surge_ping::{Client, Config as PingConfig, PingIdentifier, PingSequence};

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct PingDriver;

#[async_trait]
impl ProbeDriver for PingDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Ping(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a ping probe".to_string()));
        };

        let addr = tokio::net::lookup_host((config.host.as_str(), 0))
            .await
            .map_err(|e| CoreError::Network(format!("dns resolution for ping target failed: {e}")))?
            .next()
            .ok_or_else(|| CoreError::Network(format!("no address found for {}", config.host)))?
            .ip();

        let client = Client::new(&PingConfig::default()).map_err(|e| CoreError::Network(e.to_string()))?;
        let mut pinger = client.pinger(addr, PingIdentifier(rand::random())).await;
        pinger.timeout(ctx.timeout);

        let payload = vec![0u8; config.packet_size.unwrap_or(56) as usize];
        let start = Instant::now();
        match pinger.ping(PingSequence(0), &payload).await {
            Ok((_packet, rtt)) => {
                let _ = start.elapsed();
                Ok(ProbeOutcome::up(format!("{} - Alive", config.host)).with_ping(rtt.as_millis() as i64))
            }
            Err(e) => Ok(ProbeOutcome::down(format!("{} - {e}", config.host))),
        }
    }
}
