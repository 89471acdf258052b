//! Kafka producer driver (§4.5) — proves liveness by producing one message
//! to the configured topic and waiting for the broker's ack. `rdkafka` is
//! the pack's standard Kafka client; no consume-side check is attempted
//! since confirming delivery is cheaper and sufficient as a liveness probe.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct KafkaProducerDriver;

#[async_trait]
impl ProbeDriver for KafkaProducerDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::KafkaProducer(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a kafka probe".into()));
        };

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("message.timeout.ms", ctx.timeout.as_millis().to_string())
            .create()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        let record = FutureRecord::to(&config.topic).payload(&config.message).key(&monitor.id);

        match producer.send(record, ctx.timeout).await {
            Ok((partition, offset)) => Ok(ProbeOutcome::up(format!("delivered to partition {partition} offset {offset}"))),
            Err((e, _)) => Ok(ProbeOutcome::down(format!("{} - {e}", config.topic))),
        }
    }
}
