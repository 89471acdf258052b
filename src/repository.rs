//! Repository façade (§6.2) — the narrow, typed view over Storage the core
//! actually consumes. `SqliteRepository` is grounded in the teacher's
//! `db::Db`: one `Mutex<rusqlite::Connection>`, WAL journal mode, and the
//! same `ALTER TABLE ... ADD COLUMN` migration style for additive schema
//! changes.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, CoreResult};
use crate::model::{Heartbeat, MaintenanceWindow, MonitorId, Status, TlsCertEntry, TlsInfo};

/// The storage contract the monitor runtime depends on. Swap in any backend
/// (Postgres, a remote KV store, an in-memory fake for tests) by implementing
/// this trait — the runtime never touches SQL directly.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_latest_heartbeat(&self, monitor_id: &str) -> CoreResult<Option<Heartbeat>>;
    async fn append_heartbeat(&self, heartbeat: &Heartbeat) -> CoreResult<()>;
    async fn heartbeats_since(&self, monitor_id: &str, since: DateTime<Utc>) -> CoreResult<Vec<Heartbeat>>;

    /// Consumed by the push probe driver: the latest heartbeat an external
    /// agent posted for `token`, if any newer than `since`.
    async fn latest_push_heartbeat(&self, token: &str, since: DateTime<Utc>) -> CoreResult<Option<Heartbeat>>;

    async fn list_children(&self, parent_id: &str) -> CoreResult<Vec<MonitorId>>;
    async fn set_parent(&self, monitor_id: &str, parent_id: &str) -> CoreResult<()>;
    async fn list_active_maintenances(&self, monitor_id: &str, now: DateTime<Utc>) -> CoreResult<Vec<MaintenanceWindow>>;
    async fn add_maintenance_window(&self, window: &MaintenanceWindow) -> CoreResult<()>;

    async fn upsert_tls_info(&self, info: &TlsInfo) -> CoreResult<()>;
    async fn find_tls_info(&self, monitor_id: &str) -> CoreResult<Option<TlsInfo>>;

    async fn has_notification_sent(&self, kind: &str, monitor_id: &str, days_le: u32) -> CoreResult<bool>;
    async fn record_notification_sent(&self, kind: &str, monitor_id: &str, days: u32) -> CoreResult<()>;
    async fn clear_notification_sent(&self, kind: &str, monitor_id: &str) -> CoreResult<()>;

    async fn get_setting(&self, key: &str) -> CoreResult<Option<String>>;
    async fn set_setting(&self, key: &str, value: &str, namespace: &str) -> CoreResult<()>;

    async fn persist_dns_last_result(&self, monitor_id: &str, result: &str) -> CoreResult<()>;
    async fn dns_last_result(&self, monitor_id: &str) -> CoreResult<Option<String>>;
}

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn open(path: &str) -> CoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| CoreError::Repository(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let repo = SqliteRepository { conn: Mutex::new(conn) };
        repo.migrate()?;
        Ok(repo)
    }

    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| CoreError::Repository(e.to_string()))?;
        let repo = SqliteRepository { conn: Mutex::new(conn) };
        repo.migrate()?;
        Ok(repo)
    }

    fn migrate(&self) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS heartbeats (
                id TEXT PRIMARY KEY,
                monitor_id TEXT NOT NULL,
                push_token TEXT,
                time TEXT NOT NULL,
                status INTEGER NOT NULL,
                msg TEXT NOT NULL DEFAULT '',
                ping INTEGER,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                important INTEGER NOT NULL DEFAULT 0,
                down_count INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_heartbeats_monitor ON heartbeats(monitor_id, time DESC);
            CREATE INDEX IF NOT EXISTS idx_heartbeats_push_token ON heartbeats(push_token, time DESC);

            CREATE TABLE IF NOT EXISTS monitor_parents (
                monitor_id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS maintenance_windows (
                id TEXT PRIMARY KEY,
                monitor_id TEXT NOT NULL,
                starts_at TEXT NOT NULL,
                ends_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_maintenance_monitor ON maintenance_windows(monitor_id);

            CREATE TABLE IF NOT EXISTS tls_info (
                monitor_id TEXT PRIMARY KEY,
                chain_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notification_sent_history (
                kind TEXT NOT NULL,
                monitor_id TEXT NOT NULL,
                days INTEGER NOT NULL,
                PRIMARY KEY (kind, monitor_id, days)
            );

            CREATE TABLE IF NOT EXISTS settings (
                namespace TEXT NOT NULL DEFAULT 'default',
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );

            CREATE TABLE IF NOT EXISTS dns_last_result (
                monitor_id TEXT PRIMARY KEY,
                result TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }
}

fn status_to_i64(status: Status) -> i64 {
    status as u8 as i64
}

fn status_from_i64(v: i64) -> CoreResult<Status> {
    match v {
        0 => Ok(Status::Down),
        1 => Ok(Status::Up),
        2 => Ok(Status::Pending),
        3 => Ok(Status::Maintenance),
        other => Err(CoreError::Repository(format!("bad status code in storage: {other}"))),
    }
}

fn row_to_heartbeat(row: &rusqlite::Row) -> rusqlite::Result<Heartbeat> {
    let status_raw: i64 = row.get("status")?;
    let time_str: String = row.get("time")?;
    Ok(Heartbeat {
        id: row.get("id")?,
        monitor_id: row.get("monitor_id")?,
        time: DateTime::parse_from_rfc3339(&time_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        status: status_from_i64(status_raw).unwrap_or(Status::Down),
        msg: row.get("msg")?,
        ping: row.get("ping")?,
        duration_secs: row.get("duration_secs")?,
        important: row.get::<_, i64>("important")? != 0,
        down_count: row.get::<_, i64>("down_count")? as u32,
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn find_latest_heartbeat(&self, monitor_id: &str) -> CoreResult<Option<Heartbeat>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM heartbeats WHERE monitor_id = ?1 ORDER BY time DESC LIMIT 1",
            params![monitor_id],
            row_to_heartbeat,
        )
        .optional()
        .map_err(|e| CoreError::Repository(e.to_string()))
    }

    async fn append_heartbeat(&self, heartbeat: &Heartbeat) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO heartbeats (id, monitor_id, time, status, msg, ping, duration_secs, important, down_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                heartbeat.id,
                heartbeat.monitor_id,
                heartbeat.time.to_rfc3339(),
                status_to_i64(heartbeat.status),
                heartbeat.msg,
                heartbeat.ping,
                heartbeat.duration_secs,
                heartbeat.important as i64,
                heartbeat.down_count,
            ],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn heartbeats_since(&self, monitor_id: &str, since: DateTime<Utc>) -> CoreResult<Vec<Heartbeat>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM heartbeats WHERE monitor_id = ?1 AND time > ?2 ORDER BY time ASC")
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let rows = stmt
            .query_map(params![monitor_id, since.to_rfc3339()], row_to_heartbeat)
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CoreError::Repository(e.to_string()))?);
        }
        Ok(out)
    }

    async fn latest_push_heartbeat(&self, token: &str, since: DateTime<Utc>) -> CoreResult<Option<Heartbeat>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM heartbeats WHERE push_token = ?1 AND time > ?2 ORDER BY time DESC LIMIT 1",
            params![token, since.to_rfc3339()],
            row_to_heartbeat,
        )
        .optional()
        .map_err(|e| CoreError::Repository(e.to_string()))
    }

    async fn list_children(&self, parent_id: &str) -> CoreResult<Vec<MonitorId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT monitor_id FROM monitor_parents WHERE parent_id = ?1")
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let rows = stmt
            .query_map(params![parent_id], |row| row.get::<_, String>(0))
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CoreError::Repository(e.to_string()))?);
        }
        Ok(out)
    }

    async fn set_parent(&self, monitor_id: &str, parent_id: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO monitor_parents (monitor_id, parent_id) VALUES (?1, ?2)
             ON CONFLICT(monitor_id) DO UPDATE SET parent_id = excluded.parent_id",
            params![monitor_id, parent_id],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn list_active_maintenances(&self, monitor_id: &str, now: DateTime<Utc>) -> CoreResult<Vec<MaintenanceWindow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, monitor_id, starts_at, ends_at FROM maintenance_windows
                 WHERE monitor_id = ?1 AND starts_at <= ?2 AND ends_at >= ?2",
            )
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let now_str = now.to_rfc3339();
        let rows = stmt
            .query_map(params![monitor_id, now_str], |row| {
                let starts_at: String = row.get(2)?;
                let ends_at: String = row.get(3)?;
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, starts_at, ends_at))
            })
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let (id, monitor_id, starts_at, ends_at) = row.map_err(|e| CoreError::Repository(e.to_string()))?;
            out.push(MaintenanceWindow {
                id,
                monitor_id,
                starts_at: DateTime::parse_from_rfc3339(&starts_at).unwrap().with_timezone(&Utc),
                ends_at: DateTime::parse_from_rfc3339(&ends_at).unwrap().with_timezone(&Utc),
            });
        }
        Ok(out)
    }

    async fn add_maintenance_window(&self, window: &MaintenanceWindow) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO maintenance_windows (id, monitor_id, starts_at, ends_at) VALUES (?1, ?2, ?3, ?4)",
            params![window.id, window.monitor_id, window.starts_at.to_rfc3339(), window.ends_at.to_rfc3339()],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn upsert_tls_info(&self, info: &TlsInfo) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let chain_json = serde_json::to_string(&info.chain).map_err(|e| CoreError::Repository(e.to_string()))?;
        conn.execute(
            "INSERT INTO tls_info (monitor_id, chain_json) VALUES (?1, ?2)
             ON CONFLICT(monitor_id) DO UPDATE SET chain_json = excluded.chain_json",
            params![info.monitor_id, chain_json],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn find_tls_info(&self, monitor_id: &str) -> CoreResult<Option<TlsInfo>> {
        let conn = self.conn.lock().unwrap();
        let chain_json: Option<String> = conn
            .query_row(
                "SELECT chain_json FROM tls_info WHERE monitor_id = ?1",
                params![monitor_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        match chain_json {
            None => Ok(None),
            Some(raw) => {
                let chain: Vec<TlsCertEntry> = serde_json::from_str(&raw).map_err(|e| CoreError::Repository(e.to_string()))?;
                Ok(Some(TlsInfo {
                    monitor_id: monitor_id.to_string(),
                    chain,
                }))
            }
        }
    }

    async fn has_notification_sent(&self, kind: &str, monitor_id: &str, days_le: u32) -> CoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notification_sent_history WHERE kind = ?1 AND monitor_id = ?2 AND days <= ?3",
                params![kind, monitor_id, days_le],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(count > 0)
    }

    async fn record_notification_sent(&self, kind: &str, monitor_id: &str, days: u32) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO notification_sent_history (kind, monitor_id, days) VALUES (?1, ?2, ?3)",
            params![kind, monitor_id, days],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn clear_notification_sent(&self, kind: &str, monitor_id: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM notification_sent_history WHERE kind = ?1 AND monitor_id = ?2",
            params![kind, monitor_id],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> CoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM settings WHERE namespace = 'default' AND key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CoreError::Repository(e.to_string()))
    }

    async fn set_setting(&self, key: &str, value: &str, namespace: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value",
            params![namespace, key, value],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn persist_dns_last_result(&self, monitor_id: &str, result: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO dns_last_result (monitor_id, result) VALUES (?1, ?2)
             ON CONFLICT(monitor_id) DO UPDATE SET result = excluded.result",
            params![monitor_id, result],
        )
        .map_err(|e| CoreError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn dns_last_result(&self, monitor_id: &str) -> CoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT result FROM dns_last_result WHERE monitor_id = ?1",
            params![monitor_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CoreError::Repository(e.to_string()))
    }
}

/// Known root-CA fingerprints skipped during expiry evaluation (§4.7). Kept
/// tiny and explicit rather than bundling a root store here; callers can
/// extend it from `webpki-roots` fingerprints if they want full coverage.
pub fn is_known_root(fingerprint256: &str, known_roots: &HashSet<String>) -> bool {
    known_roots.contains(fingerprint256)
}
