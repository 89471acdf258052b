//! Probe dispatch (§4.5) — one [`ProbeDriver`] implementation per
//! [`crate::model::MonitorType`], looked up through a [`ProbeRegistry`]
//! instead of the teacher's `match` over a monitor "type" string. Every
//! driver is independently testable against a fake or local listener; the
//! runtime only ever depends on the trait.

pub mod database;
pub mod docker;
pub mod dns;
pub mod gamedig;
pub mod grpc;
pub mod http;
pub mod kafka;
pub mod mqtt;
pub mod ping;
pub mod push;
pub mod radius;
pub mod steam;
pub mod tcp;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::env::Env;
use crate::error::CoreResult;
use crate::model::{Monitor, MonitorType, Status, TlsInfo};
use crate::repository::Repository;

/// What a probe observed this tick. The runtime turns this into a
/// [`crate::model::Heartbeat`] (§4.2 step 5); drivers never construct a
/// heartbeat themselves, since `id`/`time`/`important`/`down_count` are the
/// runtime's business, not the probe's.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: Status,
    pub msg: String,
    pub ping_ms: Option<i64>,
    pub tls_info: Option<TlsInfo>,
}

impl ProbeOutcome {
    pub fn up(msg: impl Into<String>) -> Self {
        ProbeOutcome {
            status: Status::Up,
            msg: msg.into(),
            ping_ms: None,
            tls_info: None,
        }
    }

    pub fn down(msg: impl Into<String>) -> Self {
        ProbeOutcome {
            status: Status::Down,
            msg: msg.into(),
            ping_ms: None,
            tls_info: None,
        }
    }

    pub fn with_ping(mut self, ping_ms: i64) -> Self {
        self.ping_ms = Some(ping_ms);
        self
    }

    pub fn with_tls(mut self, tls_info: TlsInfo) -> Self {
        self.tls_info = Some(tls_info);
        self
    }
}

/// Per-tick context threaded into a driver. `timeout` is already padded
/// (§4.2 step 2, §5) and `cancellation` fires when the runtime is shutting
/// down or the monitor was deleted mid-probe.
pub struct ProbeContext {
    pub repository: Arc<dyn Repository>,
    pub env: Arc<Env>,
    pub timeout: Duration,
    pub cancellation: CancellationToken,
}

#[async_trait]
pub trait ProbeDriver: Send + Sync {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome>;
}

/// `HashMap<MonitorType, Arc<dyn ProbeDriver>>` — §4.5, §9, §11 (REDESIGN:
/// replaces the teacher's open-ended `match monitor.monitor_type.as_str()`
/// with a registry an embedder can extend without touching the runtime).
pub struct ProbeRegistry {
    drivers: HashMap<MonitorType, Arc<dyn ProbeDriver>>,
}

impl ProbeRegistry {
    pub fn builder() -> ProbeRegistryBuilder {
        ProbeRegistryBuilder { drivers: HashMap::new() }
    }

    pub fn get(&self, monitor_type: MonitorType) -> Option<&Arc<dyn ProbeDriver>> {
        self.drivers.get(&monitor_type)
    }

    /// Wires every driver this crate ships. An embedder who wants to swap
    /// one out (e.g. a mocked HTTP driver in tests) should build their own
    /// registry with [`ProbeRegistry::builder`] instead of calling this.
    pub fn with_builtin_drivers() -> Self {
        ProbeRegistry::builder()
            .register(MonitorType::Http, Arc::new(http::HttpDriver))
            .register(MonitorType::Keyword, Arc::new(http::KeywordDriver))
            .register(MonitorType::JsonQuery, Arc::new(http::JsonQueryDriver))
            .register(MonitorType::Port, Arc::new(tcp::TcpDriver))
            .register(MonitorType::Ping, Arc::new(ping::PingDriver))
            .register(MonitorType::Dns, Arc::new(dns::DnsDriver))
            .register(MonitorType::Push, Arc::new(push::PushDriver))
            .register(MonitorType::Steam, Arc::new(steam::SteamDriver))
            .register(MonitorType::GameDig, Arc::new(gamedig::GameDigDriver))
            .register(MonitorType::Docker, Arc::new(docker::DockerDriver))
            .register(MonitorType::Mqtt, Arc::new(mqtt::MqttDriver))
            .register(MonitorType::SqlServer, Arc::new(database::MssqlDriver))
            .register(MonitorType::Postgres, Arc::new(database::PostgresDriver))
            .register(MonitorType::Mysql, Arc::new(database::MysqlDriver))
            .register(MonitorType::MongoDb, Arc::new(database::MongoDriver))
            .register(MonitorType::Redis, Arc::new(database::RedisDriver))
            .register(MonitorType::Radius, Arc::new(radius::RadiusDriver))
            .register(MonitorType::GrpcKeyword, Arc::new(grpc::GrpcKeywordDriver))
            .register(MonitorType::KafkaProducer, Arc::new(kafka::KafkaProducerDriver))
            .build()
    }
}

pub struct ProbeRegistryBuilder {
    drivers: HashMap<MonitorType, Arc<dyn ProbeDriver>>,
}

impl ProbeRegistryBuilder {
    pub fn register(mut self, monitor_type: MonitorType, driver: Arc<dyn ProbeDriver>) -> Self {
        self.drivers.insert(monitor_type, driver);
        self
    }

    pub fn build(self) -> ProbeRegistry {
        ProbeRegistry { drivers: self.drivers }
    }
}
