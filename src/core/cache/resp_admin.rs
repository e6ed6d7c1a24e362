// src/core/cache/resp_admin.rs

//! A `CacheAdministrator` for RESP cache nodes that support `CLUSTER MEET`.

use super::CacheAdministrator;
use super::client::CacheNodeClient;
use crate::core::ClusterJoinError;
use crate::core::cluster::outcome::StepOutcome;
use crate::core::cluster::ports::PortAllocator;
use crate::core::cluster::registry::ServerRegistry;
use crate::core::cluster::server::ServerPort;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Overrides the address the local cache node is reached on.
pub const CACHE_BIND_ADDRESS: &str = "CACHE_BINDADDRESS";
/// Overrides the local cache node's port.
pub const CACHE_BIND_PORT: &str = "CACHE_BINDPORT";
/// Overrides the peer list, formatted `ip[port], ip[port]`.
pub const CACHE_INITIAL_HOSTS: &str = "CACHE_TCP_INITIAL_HOSTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNodeAddr {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for CacheNodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.host, self.port)
    }
}

/// The local node and the peers it was introduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMembership {
    pub local: CacheNodeAddr,
    pub peers: Vec<CacheNodeAddr>,
}

/// Parses an `ip[port], ip[port]` host list.
pub fn parse_host_list(list: &str) -> Result<Vec<CacheNodeAddr>, ClusterJoinError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let malformed =
                || ClusterJoinError::Configuration(format!("malformed host entry '{entry}'"));
            let (host, rest) = entry.split_once('[').ok_or_else(malformed)?;
            let port = rest
                .strip_suffix(']')
                .and_then(|p| p.trim().parse::<u16>().ok())
                .filter(|p| *p > 0)
                .ok_or_else(malformed)?;
            let host = host.trim();
            if host.is_empty() {
                return Err(malformed());
            }
            Ok(CacheNodeAddr {
                host: host.to_string(),
                port,
            })
        })
        .collect()
}

fn non_blank<'a>(properties: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

pub struct RespCacheAdministrator {
    registry: Arc<dyn ServerRegistry>,
    ports: Arc<PortAllocator>,
    bind_host: Option<String>,
    timeout: Duration,
    membership: Mutex<Option<CacheMembership>>,
}

impl RespCacheAdministrator {
    pub fn new(
        registry: Arc<dyn ServerRegistry>,
        ports: Arc<PortAllocator>,
        bind_host: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ports,
            bind_host: bind_host.filter(|h| !h.trim().is_empty()),
            timeout,
            membership: Mutex::new(None),
        }
    }

    /// The membership configured by the last successful `set_cluster_membership`.
    pub fn membership(&self) -> Option<CacheMembership> {
        self.membership.lock().clone()
    }

    async fn resolve_peers(
        &self,
        properties: &HashMap<String, String>,
        server_id: &str,
    ) -> Result<Vec<CacheNodeAddr>, ClusterJoinError> {
        if let Some(list) = non_blank(properties, CACHE_INITIAL_HOSTS) {
            return parse_host_list(list);
        }
        let alive = match self.registry.get_alive_servers().await {
            Ok(servers) => servers,
            Err(e) => {
                warn!("Could not list alive servers for cache membership: {}", e);
                Vec::new()
            }
        };
        Ok(alive
            .into_iter()
            .filter(|server| server.server_id != server_id)
            .filter_map(|server| {
                server.port(ServerPort::CachePort).map(|port| CacheNodeAddr {
                    host: server.ip_address,
                    port,
                })
            })
            .collect())
    }
}

#[async_trait]
impl CacheAdministrator for RespCacheAdministrator {
    async fn set_cluster_membership(
        &self,
        properties: &HashMap<String, String>,
        server_id: &str,
    ) -> Result<(), ClusterJoinError> {
        let mut server = self.registry.get_server(server_id).await?;

        let host = non_blank(properties, CACHE_BIND_ADDRESS)
            .map(str::to_string)
            .or_else(|| self.bind_host.clone())
            .unwrap_or_else(|| server.ip_address.clone());

        let port = match non_blank(properties, CACHE_BIND_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| {
                    ClusterJoinError::Configuration(format!(
                        "{CACHE_BIND_PORT} '{raw}' is not a valid port"
                    ))
                })?,
            None => match server.port(ServerPort::CachePort) {
                Some(port) => port,
                None => match self.ports.allocate(server_id, ServerPort::CachePort).await {
                    StepOutcome::Complete(port) => port,
                    StepOutcome::Degraded { value, cause } => {
                        warn!("Using default cache port {} ({})", value, cause);
                        value
                    }
                },
            },
        };

        if server.port(ServerPort::CachePort) != Some(port) {
            server.set_port(ServerPort::CachePort, port);
            if let Err(e) = self.registry.update_server(&server).await {
                warn!("Could not record cache port for server {}: {}", server_id, e);
            }
        }

        let local = CacheNodeAddr { host, port };
        let peers: Vec<CacheNodeAddr> = self
            .resolve_peers(properties, server_id)
            .await?
            .into_iter()
            .filter(|peer| *peer != local)
            .collect();

        if !peers.is_empty() {
            let mut client = CacheNodeClient::connect(&local.host, local.port, self.timeout).await?;
            for peer in &peers {
                client.cluster_meet(&peer.host, peer.port).await?;
            }
        }

        info!(
            "Cache node {} introduced to {} peer(s).",
            local,
            peers.len()
        );
        *self.membership.lock() = Some(CacheMembership { local, peers });
        Ok(())
    }

    async fn test_cluster_connectivity(&self) -> Result<(), ClusterJoinError> {
        let membership = self.membership().ok_or_else(|| {
            ClusterJoinError::CacheCluster("cache cluster membership not configured".to_string())
        })?;

        let mut unreachable = Vec::new();
        for node in std::iter::once(&membership.local).chain(membership.peers.iter()) {
            let result = match CacheNodeClient::connect(&node.host, node.port, self.timeout).await
            {
                Ok(mut client) => client.ping().await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("Cache node {} failed connectivity test: {}", node, e);
                unreachable.push(node.to_string());
            }
        }

        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(ClusterJoinError::CacheCluster(format!(
                "unreachable cache nodes: {}",
                unreachable.join(", ")
            )))
        }
    }
}
