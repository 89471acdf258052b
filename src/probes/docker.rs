//! Docker container driver (§4.5) — checks a container's running state via
//! `bollard`, the same Docker Engine API client the pack uses elsewhere for
//! container-aware tooling. Supports both the local socket and a remote
//! TCP daemon, matching `DockerConnection`.

use async_trait::async_trait;
use bollard::Docker;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{DockerConnection, Monitor, ProbeConfig};

pub struct DockerDriver;

fn connect(connection: &DockerConnection) -> CoreResult<Docker> {
    match connection {
        DockerConnection::Socket(path) => Docker::connect_with_socket(path, 10, bollard::API_DEFAULT_VERSION).map_err(|e| CoreError::Config(e.to_string())),
        DockerConnection::Tcp { host, port, tls } => {
            let address = format!("{host}:{port}");
            if *tls {
                Docker::connect_with_ssl_defaults().map_err(|e| CoreError::Config(e.to_string()))
            } else {
                Docker::connect_with_http(&address, 10, bollard::API_DEFAULT_VERSION).map_err(|e| CoreError::Config(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl ProbeDriver for DockerDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Docker(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a docker probe".into()));
        };

        let docker = connect(&config.connection)?;
        let inspect = tokio::time::timeout(ctx.timeout, docker.inspect_container(&config.container_id, None))
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        let state = inspect.state.unwrap_or_default();
        let running = state.running.unwrap_or(false);
        let status_text = state.status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());

        if running {
            Ok(ProbeOutcome::up(format!("{} - {status_text}", config.container_id)))
        } else {
            Ok(ProbeOutcome::down(format!("{} - {status_text}", config.container_id)))
        }
    }
}
