// src/core/cluster/coordinator.rs

//! Orchestrates a server joining the cluster: cache membership, port assignment,
//! search-engine discovery, and recording the result in the registry.

use super::outcome::{JoinReport, JoinStep, StepOutcome};
use super::ports::PortAllocator;
use super::properties::{ClusterJoinProperties, JoinProperty, unicast_hosts};
use super::registry::ServerRegistry;
use super::server::ServerPort;
use crate::core::ClusterJoinError;
use crate::core::cache::DistributedCacheJoiner;
use crate::core::metrics::{JOINS_TOTAL, SERVER_PERSIST_FAILURES_TOTAL};
use crate::core::search::SearchEngineJoiner;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct ClusterMembershipCoordinator {
    registry: Arc<dyn ServerRegistry>,
    ports: Arc<PortAllocator>,
    cache: DistributedCacheJoiner,
    search: SearchEngineJoiner,
    /// Joins started from this process never interleave.
    join_lock: Mutex<()>,
}

impl ClusterMembershipCoordinator {
    pub fn new(
        registry: Arc<dyn ServerRegistry>,
        ports: Arc<PortAllocator>,
        cache: DistributedCacheJoiner,
        search: SearchEngineJoiner,
    ) -> Self {
        Self {
            registry,
            ports,
            cache,
            search,
            join_lock: Mutex::new(()),
        }
    }

    /// Joins `server_id` to the cluster without property overrides.
    pub async fn add_server(&self, server_id: &str) -> Result<JoinReport, ClusterJoinError> {
        self.add_node_to_cluster(None, server_id).await
    }

    /// Joins `server_id` to the cluster.
    ///
    /// Any non-blank value in `overrides`, keyed by [`JoinProperty::key`], is used
    /// verbatim for that property. Returns an error only if cache membership, reading
    /// the server record, resolving a port, or the search-engine join fails; a failed
    /// write of the updated server record is reported in the returned [`JoinReport`].
    pub async fn add_node_to_cluster(
        &self,
        overrides: Option<HashMap<String, String>>,
        server_id: &str,
    ) -> Result<JoinReport, ClusterJoinError> {
        let _guard = self.join_lock.lock().await;
        let overrides = overrides.unwrap_or_default();

        let result = self.join(&overrides, server_id).await;
        let outcome = if result.is_ok() { "ok" } else { "failed" };
        JOINS_TOTAL.with_label_values(&[outcome]).inc();
        if let Err(e) = &result {
            error!("Server {} failed to join the cluster: {}", server_id, e);
        }
        result
    }

    async fn join(
        &self,
        overrides: &HashMap<String, String>,
        server_id: &str,
    ) -> Result<JoinReport, ClusterJoinError> {
        // Cache membership comes first: the alive-server view depends on it.
        let mut degraded = self.cache.join(overrides, server_id).await?;

        let mut current = self.registry.get_server(server_id).await?;
        let mut properties = ClusterJoinProperties::new();

        let network_host = JoinProperty::NetworkHost
            .override_from(overrides)
            .map(str::to_string)
            .unwrap_or_else(|| current.ip_address.clone());
        properties.insert(JoinProperty::NetworkHost, network_host);

        for (property, kind, step) in [
            (
                JoinProperty::TransportTcpPort,
                ServerPort::SearchTransport,
                JoinStep::TransportPortAllocation,
            ),
            (
                JoinProperty::HttpPort,
                ServerPort::SearchHttp,
                JoinStep::HttpPortAllocation,
            ),
        ] {
            let raw = match property.override_from(overrides) {
                Some(value) => value.to_string(),
                None => self
                    .ports
                    .allocate(server_id, kind)
                    .await
                    .record(step, &mut degraded)
                    .to_string(),
            };
            let port = parse_port(property, &raw)?;
            current.set_port(kind, port);
            properties.insert(property, raw);
        }

        for property in [JoinProperty::MulticastEnabled, JoinProperty::PingTimeout] {
            let value = property
                .override_from(overrides)
                .or(property.default_value())
                .unwrap_or_default();
            properties.insert(property, value);
        }

        let mut servers = match self.registry.get_alive_servers().await {
            Ok(servers) => StepOutcome::Complete(servers),
            Err(e) => {
                error!("Error getting alive servers: {}", e);
                StepOutcome::Degraded {
                    value: Vec::new(),
                    cause: e,
                }
            }
        }
        .record(JoinStep::AliveServers, &mut degraded);
        servers.push(current.clone());

        let hosts = match JoinProperty::UnicastHosts.override_from(overrides) {
            Some(value) => value.to_string(),
            None => unicast_hosts(
                &servers,
                self.ports.default_port(ServerPort::SearchTransport),
            ),
        };
        properties.insert(JoinProperty::UnicastHosts, hosts);

        self.search.join(&properties).await?;

        let persisted = match self.registry.update_server(&current).await {
            Ok(()) => StepOutcome::Complete(()),
            Err(e) => {
                SERVER_PERSIST_FAILURES_TOTAL.inc();
                error!(
                    "Error trying to update server. Server Id: {}: {}",
                    current.server_id, e
                );
                StepOutcome::Degraded { value: (), cause: e }
            }
        };
        persisted.record(JoinStep::PersistServer, &mut degraded);

        if degraded.is_empty() {
            info!("Server {} joined the cluster.", server_id);
        } else {
            let steps: Vec<&str> = degraded.iter().map(|d| d.step.as_str()).collect();
            warn!(
                "Server {} joined the cluster with degraded steps: {}",
                server_id,
                steps.join(", ")
            );
        }

        Ok(JoinReport {
            server_id: server_id.to_string(),
            properties,
            degraded,
        })
    }
}

fn parse_port(property: JoinProperty, raw: &str) -> Result<u16, ClusterJoinError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| {
            ClusterJoinError::Configuration(format!("{property} '{raw}' is not a valid port"))
        })
}
