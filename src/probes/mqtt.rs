//! MQTT driver (§4.5) — subscribes to a topic and waits for a matching
//! message within the probe timeout. Grounded in the teacher's general
//! "connect, wait, assert" check shape; `rumqttc` supplies the client since
//! the teacher's stack has no MQTT dependency of its own.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct MqttDriver;

#[async_trait]
impl ProbeDriver for MqttDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Mqtt(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not an mqtt probe".into()));
        };

        let client_id = format!("pulsewatch-{}", monitor.id);
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(5));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        client
            .subscribe(&config.topic, QoS::AtMostOnce)
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + ctx.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(ProbeOutcome::down(format!("no message on {} within timeout", config.topic)));
            }
            match tokio::time::timeout(remaining, eventloop.poll()).await {
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    let payload = String::from_utf8_lossy(&publish.payload);
                    if payload.contains(&config.success_message) {
                        return Ok(ProbeOutcome::up(format!("{} - matched", config.topic)));
                    }
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Ok(ProbeOutcome::down(format!("mqtt connection error: {e}"))),
                Err(_) => return Ok(ProbeOutcome::down(format!("no message on {} within timeout", config.topic))),
            }
        }
    }
}
