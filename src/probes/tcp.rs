//! TCP port driver (§4.5) — a bare connect-and-close, grounded in the
//! teacher's `checker.rs` TCP check (`TcpStream::connect` under a timeout).

use std::time::Instant;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct TcpDriver;

#[async_trait]
impl ProbeDriver for TcpDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Port(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a port probe".to_string()));
        };

        let start = Instant::now();
        let addr = (config.host.as_str(), config.port);
        let connect = tokio::time::timeout(ctx.timeout, TcpStream::connect(addr)).await;

        match connect {
            Ok(Ok(_stream)) => Ok(ProbeOutcome::up(format!("{}:{} - Connected", config.host, config.port)).with_ping(start.elapsed().as_millis() as i64)),
            Ok(Err(e)) => Ok(ProbeOutcome::down(format!("{}:{} - {e}", config.host, config.port))),
            Err(_) => Err(CoreError::Cancelled(ctx.timeout.as_secs_f64())),
        }
    }
}
