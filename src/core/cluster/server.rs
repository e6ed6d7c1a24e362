// src/core/cluster/server.rs

//! The server record shared through the registry, and the closed set of port roles
//! a server can be assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named role a port serves on a server.
///
/// Each role is an immutable record of the column it is persisted in, the
/// configuration key its default can be overridden with, and the built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerPort {
    /// The port the distributed cache node listens on.
    CachePort,
    /// The search-engine node-to-node transport port.
    SearchTransport,
    /// The search-engine HTTP port.
    SearchHttp,
}

impl ServerPort {
    pub const ALL: [ServerPort; 3] = [
        ServerPort::CachePort,
        ServerPort::SearchTransport,
        ServerPort::SearchHttp,
    ];

    /// The `server` table column holding ports of this kind.
    pub const fn column(self) -> &'static str {
        match self {
            ServerPort::CachePort => "cache_port",
            ServerPort::SearchTransport => "es_transport_tcp_port",
            ServerPort::SearchHttp => "es_http_port",
        }
    }

    /// The configuration key whose value replaces the built-in default.
    pub const fn property_name(self) -> &'static str {
        match self {
            ServerPort::CachePort => "CACHE_BINDPORT",
            ServerPort::SearchTransport => "es.transport.tcp.port",
            ServerPort::SearchHttp => "es.http.port",
        }
    }

    pub const fn default_value(self) -> u16 {
        match self {
            ServerPort::CachePort => 5701,
            ServerPort::SearchTransport => 9300,
            ServerPort::SearchHttp => 9200,
        }
    }
}

impl fmt::Display for ServerPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One cluster member as recorded in the server registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub server_id: String,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub ip_address: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub cache_port: Option<u16>,
    #[serde(default)]
    pub es_transport_tcp_port: Option<u16>,
    #[serde(default)]
    pub es_http_port: Option<u16>,
    #[serde(default)]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Server {
    /// Creates a server record with only its identity and address set.
    pub fn new(server_id: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            cluster_id: None,
            name: None,
            ip_address: ip_address.into(),
            host: None,
            cache_port: None,
            es_transport_tcp_port: None,
            es_http_port: None,
            last_heartbeat: None,
        }
    }

    /// Returns the assigned port of the given kind, if any.
    pub fn port(&self, kind: ServerPort) -> Option<u16> {
        match kind {
            ServerPort::CachePort => self.cache_port,
            ServerPort::SearchTransport => self.es_transport_tcp_port,
            ServerPort::SearchHttp => self.es_http_port,
        }
    }

    pub fn set_port(&mut self, kind: ServerPort, port: u16) {
        let slot = match kind {
            ServerPort::CachePort => &mut self.cache_port,
            ServerPort::SearchTransport => &mut self.es_transport_tcp_port,
            ServerPort::SearchHttp => &mut self.es_http_port,
        };
        *slot = Some(port);
    }
}
