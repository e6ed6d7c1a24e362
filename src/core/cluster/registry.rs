// src/core/cluster/registry.rs

//! The server registry: where server records live and how liveness is judged.

use super::server::Server;
use crate::core::ClusterJoinError;
use crate::core::persistence::{QueryExecutor, Row, SqlValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait ServerRegistry: Send + Sync {
    async fn get_server(&self, server_id: &str) -> Result<Server, ClusterJoinError>;

    /// Returns the servers currently considered live, in registry order.
    async fn get_alive_servers(&self) -> Result<Vec<Server>, ClusterJoinError>;

    async fn update_server(&self, server: &Server) -> Result<(), ClusterJoinError>;
}

const SERVER_COLUMNS: &str = "server_id, cluster_id, name, ip_address, host, cache_port, \
                              es_transport_tcp_port, es_http_port, last_heartbeat";

/// A `ServerRegistry` over the `server` table. A server is alive while its last
/// heartbeat is within `heartbeat_timeout`.
pub struct SqlServerRegistry {
    db: Arc<dyn QueryExecutor>,
    heartbeat_timeout: Duration,
}

impl SqlServerRegistry {
    pub fn new(db: Arc<dyn QueryExecutor>, heartbeat_timeout: Duration) -> Self {
        Self {
            db,
            heartbeat_timeout,
        }
    }

    /// Inserts a new server record.
    pub async fn register_server(&self, server: &Server) -> Result<(), ClusterJoinError> {
        let sql = "INSERT INTO server (cluster_id, name, host, ip_address, cache_port, \
                   es_transport_tcp_port, es_http_port, last_heartbeat, server_id) \
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let mut params = Self::mutable_params(server);
        params.push(server.server_id.as_str().into());
        self.db.execute(sql, params).await?;
        debug!("Registered server {}", server.server_id);
        Ok(())
    }

    /// Records a heartbeat for `server_id` at `at`.
    pub async fn heartbeat(
        &self,
        server_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ClusterJoinError> {
        let changed = self
            .db
            .execute(
                "UPDATE server SET last_heartbeat = ? WHERE server_id = ?",
                vec![at.timestamp().into(), server_id.into()],
            )
            .await?;
        if changed == 0 {
            return Err(ClusterJoinError::NotFound(format!("server {server_id}")));
        }
        Ok(())
    }

    /// Values for every column but `server_id`, in `UPDATE` order:
    /// cluster_id, name, host, ip_address, cache_port, transport, http, heartbeat.
    fn mutable_params(server: &Server) -> Vec<SqlValue> {
        vec![
            server.cluster_id.clone().into(),
            server.name.clone().into(),
            server.host.clone().into(),
            server.ip_address.as_str().into(),
            server.cache_port.into(),
            server.es_transport_tcp_port.into(),
            server.es_http_port.into(),
            server.last_heartbeat.map(|t| t.timestamp()).into(),
        ]
    }
}

fn port_from(row: &Row, column: &str) -> Result<Option<u16>, ClusterJoinError> {
    match row.get(column) {
        None | Some(SqlValue::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|port| u16::try_from(port).ok())
            .map(Some)
            .ok_or_else(|| {
                ClusterJoinError::DataAccess(format!("column {column} holds invalid port {value:?}"))
            }),
    }
}

fn text_from(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(SqlValue::as_str).map(str::to_string)
}

fn server_from_row(row: &Row) -> Result<Server, ClusterJoinError> {
    let server_id = text_from(row, "server_id")
        .ok_or_else(|| ClusterJoinError::DataAccess("server row without server_id".to_string()))?;
    let ip_address = text_from(row, "ip_address").ok_or_else(|| {
        ClusterJoinError::DataAccess(format!("server {server_id} has no ip_address"))
    })?;
    Ok(Server {
        cluster_id: text_from(row, "cluster_id"),
        name: text_from(row, "name"),
        host: text_from(row, "host"),
        cache_port: port_from(row, "cache_port")?,
        es_transport_tcp_port: port_from(row, "es_transport_tcp_port")?,
        es_http_port: port_from(row, "es_http_port")?,
        last_heartbeat: row
            .get("last_heartbeat")
            .and_then(SqlValue::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        server_id,
        ip_address,
    })
}

#[async_trait]
impl ServerRegistry for SqlServerRegistry {
    async fn get_server(&self, server_id: &str) -> Result<Server, ClusterJoinError> {
        let sql = format!("SELECT {SERVER_COLUMNS} FROM server WHERE server_id = ?");
        let rows = self.db.query(&sql, vec![server_id.into()]).await?;
        match rows.first() {
            Some(row) => server_from_row(row),
            None => Err(ClusterJoinError::NotFound(format!("server {server_id}"))),
        }
    }

    async fn get_alive_servers(&self) -> Result<Vec<Server>, ClusterJoinError> {
        let window = chrono::Duration::from_std(self.heartbeat_timeout)
            .map_err(|e| ClusterJoinError::Configuration(format!("heartbeat timeout: {e}")))?;
        let cutoff = Utc::now()
            .checked_sub_signed(window)
            .ok_or_else(|| {
                ClusterJoinError::Configuration(format!(
                    "heartbeat timeout {:?} reaches before the earliest representable time",
                    self.heartbeat_timeout
                ))
            })?
            .timestamp();
        let sql = format!(
            "SELECT {SERVER_COLUMNS} FROM server WHERE last_heartbeat >= ? ORDER BY rowid"
        );
        let rows = self.db.query(&sql, vec![cutoff.into()]).await?;
        rows.iter().map(server_from_row).collect()
    }

    async fn update_server(&self, server: &Server) -> Result<(), ClusterJoinError> {
        let sql = "UPDATE server SET cluster_id = ?, name = ?, host = ?, ip_address = ?, \
                   cache_port = ?, es_transport_tcp_port = ?, es_http_port = ?, \
                   last_heartbeat = ? WHERE server_id = ?";
        let mut params = Self::mutable_params(server);
        params.push(server.server_id.as_str().into());
        let changed = self.db.execute(sql, params).await?;
        if changed == 0 {
            return Err(ClusterJoinError::NotFound(format!(
                "server {}",
                server.server_id
            )));
        }
        Ok(())
    }
}
