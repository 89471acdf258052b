//! Database family drivers (§4.5) — connect, optionally run a one-shot
//! query, disconnect. Grounded in the teacher's general connect-and-assert
//! check shape; each backend uses the driver crate the pack reaches for
//! that protocol rather than a bespoke hand-rolled client: `tiberius` for
//! SQL Server, `sqlx` for Postgres/MySQL, the `mongodb` crate, and the
//! `redis` crate.

use std::time::Instant;

use async_trait::async_trait;

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig, SqlProbeConfig};

fn extract<'a>(monitor: &'a Monitor, matches: fn(&ProbeConfig) -> Option<&SqlProbeConfig>) -> CoreResult<&'a SqlProbeConfig> {
    matches(&monitor.probe).ok_or_else(|| CoreError::Config("monitor does not match expected database probe kind".into()))
}

pub struct MssqlDriver;

#[async_trait]
impl ProbeDriver for MssqlDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let config = extract(monitor, |p| match p {
            ProbeConfig::SqlServer(c) => Some(c),
            _ => None,
        })?;

        use tiberius::{AuthMethod, Client, Config};
        use tokio::net::TcpStream;
        use tokio_util::compat::TokioAsyncWriteCompatExt;

        let mut tiberius_config = Config::from_ado_string(&config.connection_string).map_err(|e| CoreError::Config(e.to_string()))?;
        tiberius_config.trust_cert();
        if matches!(tiberius_config.get_authentication(), AuthMethod::None) {
            // ADO string without credentials; leave as-is, let tiberius surface the auth error.
        }

        let start = Instant::now();
        let tcp = tokio::time::timeout(ctx.timeout, TcpStream::connect(tiberius_config.get_addr()))
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;
        tcp.set_nodelay(true).ok();

        let mut client = Client::connect(tiberius_config, tcp.compat_write())
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;

        if let Some(query) = &config.query {
            client.simple_query(query).await.map_err(|e| CoreError::ProbePredicate(e.to_string()))?;
        }

        Ok(ProbeOutcome::up("connected").with_ping(start.elapsed().as_millis() as i64))
    }
}

pub struct PostgresDriver;

#[async_trait]
impl ProbeDriver for PostgresDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        use sqlx::{Connection, Executor};

        let config = extract(monitor, |p| match p {
            ProbeConfig::Postgres(c) => Some(c),
            _ => None,
        })?;

        let start = Instant::now();
        let mut conn = tokio::time::timeout(ctx.timeout, sqlx::postgres::PgConnection::connect(&config.connection_string))
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        if let Some(query) = &config.query {
            conn.execute(query.as_str()).await.map_err(|e| CoreError::ProbePredicate(e.to_string()))?;
        }

        Ok(ProbeOutcome::up("connected").with_ping(start.elapsed().as_millis() as i64))
    }
}

pub struct MysqlDriver;

#[async_trait]
impl ProbeDriver for MysqlDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        use sqlx::{Connection, Executor};

        let config = extract(monitor, |p| match p {
            ProbeConfig::Mysql(c) => Some(c),
            _ => None,
        })?;

        let start = Instant::now();
        let mut conn = tokio::time::timeout(ctx.timeout, sqlx::mysql::MySqlConnection::connect(&config.connection_string))
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        if let Some(query) = &config.query {
            conn.execute(query.as_str()).await.map_err(|e| CoreError::ProbePredicate(e.to_string()))?;
        }

        Ok(ProbeOutcome::up("connected").with_ping(start.elapsed().as_millis() as i64))
    }
}

pub struct MongoDriver;

#[async_trait]
impl ProbeDriver for MongoDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let config = extract(monitor, |p| match p {
            ProbeConfig::MongoDb(c) => Some(c),
            _ => None,
        })?;

        use mongodb::bson::doc;
        use mongodb::Client;

        let start = Instant::now();
        let client = tokio::time::timeout(ctx.timeout, Client::with_uri_str(&config.connection_string))
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CoreError::ProbePredicate(e.to_string()))?;

        Ok(ProbeOutcome::up("ping ok").with_ping(start.elapsed().as_millis() as i64))
    }
}

pub struct RedisDriver;

#[async_trait]
impl ProbeDriver for RedisDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let config = extract(monitor, |p| match p {
            ProbeConfig::Redis(c) => Some(c),
            _ => None,
        })?;

        use redis::AsyncCommands;

        let start = Instant::now();
        let client = redis::Client::open(config.connection_string.as_str()).map_err(|e| CoreError::Config(e.to_string()))?;
        let mut conn = tokio::time::timeout(ctx.timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CoreError::Cancelled(ctx.timeout.as_secs_f64()))?
            .map_err(|e| CoreError::Network(e.to_string()))?;

        let pong: String = conn.ping().await.map_err(|e| CoreError::ProbePredicate(e.to_string()))?;

        Ok(ProbeOutcome::up(pong).with_ping(start.elapsed().as_millis() as i64))
    }
}
