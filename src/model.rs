use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MonitorId = String;

/// §3: Status ∈ {DOWN, UP, PENDING, MAINTENANCE}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Down = 0,
    Up = 1,
    Pending = 2,
    Maintenance = 3,
}

impl Status {
    /// MAINTENANCE counts as UP for availability (§4.8, §11).
    pub fn counts_as_up_for_uptime(self) -> bool {
        matches!(self, Status::Up | Status::Maintenance)
    }
}

/// Which protocol a monitor probes. Mirrors the tag of [`ProbeConfig`] and is
/// the key of the `ProbeRegistry` (§9 — no open-ended string branching).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorType {
    Http,
    Keyword,
    JsonQuery,
    Port,
    Ping,
    Dns,
    Push,
    Steam,
    GameDig,
    Docker,
    Mqtt,
    SqlServer,
    Postgres,
    Mysql,
    MongoDb,
    Redis,
    Radius,
    GrpcKeyword,
    KafkaProducer,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone)]
pub enum BodyEncoding {
    Json(serde_json::Value),
    Xml(String),
}

#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    /// OAuth2 client-credentials grant, cached token with `expires_at` (§4.5).
    OAuth2ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    },
    /// mTLS client certificate material, PEM-encoded.
    Mtls {
        client_cert_pem: String,
        client_key_pem: String,
    },
}

#[derive(Debug, Clone)]
pub struct HttpProbeConfig {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<BodyEncoding>,
    pub accepted_status: AcceptedStatusSpec,
    pub max_redirects: u32,
    pub ignore_tls: bool,
    pub auth: AuthConfig,
    pub proxy: Option<String>,
    pub check_content_parameter: bool,
}

#[derive(Debug, Clone)]
pub struct KeywordConfig {
    pub keyword: String,
    pub invert_keyword: bool,
}

#[derive(Debug, Clone)]
pub struct JsonQueryConfig {
    pub json_path: String,
    pub expected_value: String,
}

#[derive(Debug, Clone)]
pub struct TcpProbeConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PingProbeConfig {
    pub host: String,
    pub packet_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsRecordType {
    A,
    Aaaa,
    Cname,
    Caa,
    Mx,
    Ns,
    Ptr,
    Soa,
    Srv,
    Txt,
}

#[derive(Debug, Clone)]
pub struct DnsProbeConfig {
    pub hostname: String,
    pub resolver_host: String,
    pub resolver_port: u16,
    pub record_type: DnsRecordType,
}

#[derive(Debug, Clone)]
pub struct PushProbeConfig {
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct SteamProbeConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct GameDigProbeConfig {
    pub host: String,
    pub port: u16,
    pub game_id: String,
}

#[derive(Debug, Clone)]
pub enum DockerConnection {
    Socket(String),
    Tcp { host: String, port: u16, tls: bool },
}

#[derive(Debug, Clone)]
pub struct DockerProbeConfig {
    pub connection: DockerConnection,
    pub container_id: String,
}

#[derive(Debug, Clone)]
pub struct MqttProbeConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub success_message: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SqlProbeConfig {
    pub connection_string: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RadiusProbeConfig {
    pub host: String,
    pub port: u16,
    pub secret: String,
    pub username: String,
    pub password: String,
    pub nas_identifier: String,
}

#[derive(Debug, Clone)]
pub struct GrpcProbeConfig {
    pub host: String,
    pub port: u16,
    pub method: String,
    pub request_bytes: Vec<u8>,
    pub tls: bool,
    pub keyword: String,
    pub invert_keyword: bool,
}

#[derive(Debug, Clone)]
pub struct KafkaProbeConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub message: String,
}

/// Tagged probe configuration. Each variant corresponds to one entry in
/// [`MonitorType`] and is handled by exactly one registered [`crate::probes::ProbeDriver`].
#[derive(Debug, Clone)]
pub enum ProbeConfig {
    Http(HttpProbeConfig),
    Keyword(HttpProbeConfig, KeywordConfig),
    JsonQuery(HttpProbeConfig, JsonQueryConfig),
    Port(TcpProbeConfig),
    Ping(PingProbeConfig),
    Dns(DnsProbeConfig),
    Push(PushProbeConfig),
    Steam(SteamProbeConfig),
    GameDig(GameDigProbeConfig),
    Docker(DockerProbeConfig),
    Mqtt(MqttProbeConfig),
    SqlServer(SqlProbeConfig),
    Postgres(SqlProbeConfig),
    Mysql(SqlProbeConfig),
    MongoDb(SqlProbeConfig),
    Redis(SqlProbeConfig),
    Radius(RadiusProbeConfig),
    GrpcKeyword(GrpcProbeConfig),
    KafkaProducer(KafkaProbeConfig),
    Group,
}

impl ProbeConfig {
    pub fn monitor_type(&self) -> MonitorType {
        match self {
            ProbeConfig::Http(_) => MonitorType::Http,
            ProbeConfig::Keyword(..) => MonitorType::Keyword,
            ProbeConfig::JsonQuery(..) => MonitorType::JsonQuery,
            ProbeConfig::Port(_) => MonitorType::Port,
            ProbeConfig::Ping(_) => MonitorType::Ping,
            ProbeConfig::Dns(_) => MonitorType::Dns,
            ProbeConfig::Push(_) => MonitorType::Push,
            ProbeConfig::Steam(_) => MonitorType::Steam,
            ProbeConfig::GameDig(_) => MonitorType::GameDig,
            ProbeConfig::Docker(_) => MonitorType::Docker,
            ProbeConfig::Mqtt(_) => MonitorType::Mqtt,
            ProbeConfig::SqlServer(_) => MonitorType::SqlServer,
            ProbeConfig::Postgres(_) => MonitorType::Postgres,
            ProbeConfig::Mysql(_) => MonitorType::Mysql,
            ProbeConfig::MongoDb(_) => MonitorType::MongoDb,
            ProbeConfig::Redis(_) => MonitorType::Redis,
            ProbeConfig::Radius(_) => MonitorType::Radius,
            ProbeConfig::GrpcKeyword(_) => MonitorType::GrpcKeyword,
            ProbeConfig::KafkaProducer(_) => MonitorType::KafkaProducer,
            ProbeConfig::Group => MonitorType::Group,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, ProbeConfig::Push(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ProbeConfig::Group)
    }
}

/// A single accepted-status rule: exact code, `Nxx` class, or inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    Exact(u16),
    Class(u16),
    Range(u16, u16),
}

impl StatusRule {
    pub fn matches(self, code: u16) -> bool {
        match self {
            StatusRule::Exact(c) => c == code,
            StatusRule::Class(class) => code / 100 == class,
            StatusRule::Range(lo, hi) => code >= lo && code <= hi,
        }
    }
}

/// Parses and matches the `"NNN" | "Nxx" | "LLL-HHH"` accepted-status syntax (§6.1).
#[derive(Debug, Clone, Default)]
pub struct AcceptedStatusSpec {
    pub rules: Vec<StatusRule>,
}

impl AcceptedStatusSpec {
    pub fn parse<I: IntoIterator<Item = S>, S: AsRef<str>>(items: I) -> Result<Self, String> {
        let mut rules = Vec::new();
        for raw in items {
            let item = raw.as_ref().trim();
            if let Some((lo, hi)) = item.split_once('-') {
                let lo: u16 = lo.trim().parse().map_err(|_| format!("bad range: {item}"))?;
                let hi: u16 = hi.trim().parse().map_err(|_| format!("bad range: {item}"))?;
                rules.push(StatusRule::Range(lo, hi));
            } else if item.len() == 3 && item.to_ascii_lowercase().ends_with("xx") {
                let class: u16 = item[..1].parse().map_err(|_| format!("bad class: {item}"))?;
                rules.push(StatusRule::Class(class));
            } else {
                let code: u16 = item.parse().map_err(|_| format!("bad status code: {item}"))?;
                rules.push(StatusRule::Exact(code));
            }
        }
        Ok(AcceptedStatusSpec { rules })
    }

    pub fn matches(&self, code: u16) -> bool {
        self.rules.iter().any(|r| r.matches(code))
    }
}

/// §3: Monitor — config + identity.
#[derive(Debug, Clone)]
pub struct Monitor {
    pub id: MonitorId,
    pub owner_id: String,
    pub name: String,
    pub interval_secs: u32,
    pub retry_interval_secs: u32,
    pub resend_interval_beats: u32,
    pub max_retries: u32,
    pub timeout_secs: f64,
    pub upside_down: bool,
    pub active: bool,
    pub parent_id: Option<MonitorId>,
    pub expiry_notification: bool,
    pub pre_up_command: Option<String>,
    pub pre_down_command: Option<String>,
    pub notification_providers: Vec<String>,
    pub probe: ProbeConfig,
}

impl Monitor {
    pub fn monitor_type(&self) -> MonitorType {
        self.probe.monitor_type()
    }

    /// Fields exposed to PreCommandRunner / Notifier payloads (§4.2 step 8, §4.9).
    pub fn public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "owner_id": self.owner_id,
            "upside_down": self.upside_down,
        })
    }
}

/// §3: Heartbeat — append-only probe outcome record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub id: String,
    pub monitor_id: MonitorId,
    pub time: DateTime<Utc>,
    pub status: Status,
    pub msg: String,
    pub ping: Option<i64>,
    pub duration_secs: i64,
    pub important: bool,
    pub down_count: u32,
}

/// §3: TlsInfo — per-monitor latest certificate chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsCertEntry {
    pub subject_cn: String,
    pub cert_type: String,
    pub fingerprint256: String,
    pub days_remaining: i64,
    pub valid: bool,
    pub issuer_certificate: Option<Box<TlsCertEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsInfo {
    pub monitor_id: MonitorId,
    pub chain: Vec<TlsCertEntry>,
}

impl TlsInfo {
    pub fn leaf(&self) -> Option<&TlsCertEntry> {
        self.chain.first()
    }
}

/// §3: NotificationSentHistory — dedup key for cert-expiry notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationSentKey {
    pub kind: String,
    pub monitor_id: MonitorId,
    pub days: u32,
}

/// A maintenance window, active between `starts_at` and `ends_at`.
#[derive(Debug, Clone)]
pub struct MaintenanceWindow {
    pub id: String,
    pub monitor_id: MonitorId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl MaintenanceWindow {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at && now <= self.ends_at
    }
}
