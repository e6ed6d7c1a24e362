// src/core/cluster/ports.rs

//! Per-host port allocation.
//!
//! The next port of a kind is one past the highest port of that kind already
//! assigned to any server sharing the requesting server's IP address. Hosts with
//! no assigned ports get the configured default. Nothing is cached; every call
//! scans the registry.

use super::outcome::StepOutcome;
use super::server::ServerPort;
use crate::core::ClusterJoinError;
use crate::core::metrics::PORTS_ALLOCATED_TOTAL;
use crate::core::persistence::QueryExecutor;
use crate::core::settings::ConfigService;
use std::sync::Arc;
use tracing::{debug, error};

pub struct PortAllocator {
    db: Arc<dyn QueryExecutor>,
    settings: Arc<ConfigService>,
}

impl PortAllocator {
    pub fn new(db: Arc<dyn QueryExecutor>, settings: Arc<ConfigService>) -> Self {
        Self { db, settings }
    }

    /// The configured default for `kind`.
    pub fn default_port(&self, kind: ServerPort) -> u16 {
        self.settings.default_port(kind)
    }

    /// Returns the next free port of `kind` on the host of `server_id`.
    ///
    /// Lookup failures fall back to the configured default.
    pub async fn next_available_port(&self, server_id: &str, kind: ServerPort) -> String {
        self.allocate(server_id, kind).await.into_value().to_string()
    }

    /// Like [`next_available_port`](Self::next_available_port), but reports whether the
    /// default was used because the lookup failed.
    pub async fn allocate(&self, server_id: &str, kind: ServerPort) -> StepOutcome<u16> {
        let default_port = self.settings.default_port(kind);

        match self.max_port_on_host(server_id, kind).await {
            Ok(Some(max)) => match u16::try_from(max.saturating_add(1)) {
                Ok(port) if max >= 0 => {
                    PORTS_ALLOCATED_TOTAL
                        .with_label_values(&[kind.column(), "scan"])
                        .inc();
                    debug!("Allocated {} {} for server {}", kind, port, server_id);
                    StepOutcome::Complete(port)
                }
                _ => {
                    let cause = ClusterJoinError::Configuration(format!(
                        "no {kind} left above {max} on the host of server {server_id}"
                    ));
                    error!("Could not get available server port: {}", cause);
                    self.fallback(kind, default_port, cause)
                }
            },
            Ok(None) => {
                PORTS_ALLOCATED_TOTAL
                    .with_label_values(&[kind.column(), "default"])
                    .inc();
                StepOutcome::Complete(default_port)
            }
            Err(e) => {
                error!(
                    "Could not get available {} for server {}: {}",
                    kind, server_id, e
                );
                self.fallback(kind, default_port, e)
            }
        }
    }

    fn fallback(&self, kind: ServerPort, port: u16, cause: ClusterJoinError) -> StepOutcome<u16> {
        PORTS_ALLOCATED_TOTAL
            .with_label_values(&[kind.column(), "default"])
            .inc();
        StepOutcome::Degraded { value: port, cause }
    }

    async fn max_port_on_host(
        &self,
        server_id: &str,
        kind: ServerPort,
    ) -> Result<Option<i64>, ClusterJoinError> {
        // The column comes from the closed `ServerPort` table, never from input.
        let sql = format!(
            "SELECT MAX({col}) AS port FROM server \
             WHERE ip_address = (SELECT s.ip_address FROM server s WHERE s.server_id = ?)",
            col = kind.column()
        );
        let rows = self.db.query(&sql, vec![server_id.into()]).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("port"))
            .and_then(|value| value.as_i64()))
    }
}
