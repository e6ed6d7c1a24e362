// src/core/cluster/properties.rs

//! The configuration keys handed to the search-engine node on join, and the
//! builder for its unicast discovery host list.

use super::server::Server;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// A recognized search-engine discovery setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinProperty {
    NetworkHost,
    TransportTcpPort,
    HttpPort,
    MulticastEnabled,
    PingTimeout,
    UnicastHosts,
}

impl JoinProperty {
    /// All properties in the order they are resolved.
    pub const ALL: [JoinProperty; 6] = [
        JoinProperty::NetworkHost,
        JoinProperty::TransportTcpPort,
        JoinProperty::HttpPort,
        JoinProperty::MulticastEnabled,
        JoinProperty::PingTimeout,
        JoinProperty::UnicastHosts,
    ];

    /// The key this property is known by, both in caller overrides and in the
    /// search node's settings.
    pub const fn key(self) -> &'static str {
        match self {
            JoinProperty::NetworkHost => "es.network.host",
            JoinProperty::TransportTcpPort => "es.transport.tcp.port",
            JoinProperty::HttpPort => "es.http.port",
            JoinProperty::MulticastEnabled => "es.discovery.zen.ping.multicast.enabled",
            JoinProperty::PingTimeout => "es.discovery.zen.ping.timeout",
            JoinProperty::UnicastHosts => "es.discovery.zen.ping.unicast.hosts",
        }
    }

    /// The static default, for properties that have one.
    pub const fn default_value(self) -> Option<&'static str> {
        match self {
            JoinProperty::MulticastEnabled => Some("false"),
            JoinProperty::PingTimeout => Some("5s"),
            _ => None,
        }
    }

    /// Returns the caller-supplied value for this property, ignoring blank values.
    pub fn override_from(self, overrides: &HashMap<String, String>) -> Option<&str> {
        overrides
            .get(self.key())
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

impl fmt::Display for JoinProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The resolved property mapping for exactly one join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterJoinProperties {
    values: IndexMap<JoinProperty, String>,
}

impl ClusterJoinProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, property: JoinProperty, value: impl Into<String>) {
        self.values.insert(property, value.into());
    }

    pub fn get(&self, property: JoinProperty) -> Option<&str> {
        self.values.get(&property).map(String::as_str)
    }

    /// Iterates `(key, value)` pairs in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.values
            .iter()
            .map(|(property, value)| (property.key(), value.as_str()))
    }

    /// Returns the recognized properties that still lack a value.
    pub fn missing(&self) -> Vec<JoinProperty> {
        JoinProperty::ALL
            .into_iter()
            .filter(|property| !self.values.contains_key(property))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Renders the unicast discovery host list: `ip[transport_port]` for every server,
/// in the given order, joined with `", "`.
///
/// Duplicates are kept. A server without an assigned transport port is listed with
/// `fallback_port`.
pub fn unicast_hosts(servers: &[Server], fallback_port: u16) -> String {
    servers
        .iter()
        .map(|server| {
            format!(
                "{}[{}]",
                server.ip_address,
                server.es_transport_tcp_port.unwrap_or(fallback_port)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
