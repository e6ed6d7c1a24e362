// src/core/settings.rs

//! The process-wide configuration store.
//!
//! Consumers read an immutable [`RuntimeSettings`] snapshot. The only ways to change
//! settings are [`ConfigService::set`] and [`ConfigService::enable_distributed_indexing`],
//! both of which publish a new snapshot; snapshots already handed out never change.

use crate::config::Config;
use crate::core::cluster::server::ServerPort;
use crate::core::metrics::DISTRIBUTED_INDEXING_ENABLED;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// An immutable view of the process-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub properties: BTreeMap<String, String>,
    /// Set once this node has joined a distributed cache cluster. Never cleared.
    pub distributed_indexing: bool,
}

impl RuntimeSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct ConfigService {
    current: RwLock<Arc<RuntimeSettings>>,
}

impl ConfigService {
    pub fn new(config: &Config) -> Self {
        Self::from_properties(config.properties.clone())
    }

    pub fn from_properties(properties: BTreeMap<String, String>) -> Self {
        Self {
            current: RwLock::new(Arc::new(RuntimeSettings {
                properties,
                distributed_indexing: false,
            })),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<RuntimeSettings> {
        Arc::clone(&self.current.read())
    }

    /// Returns the value for `key`, or `default` when unset.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.snapshot()
            .get(key)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    /// The configured default port for `kind`, falling back to its built-in default
    /// when the configured value is not a valid port.
    pub fn default_port(&self, kind: ServerPort) -> u16 {
        let snapshot = self.snapshot();
        match snapshot.get(kind.property_name()) {
            None => kind.default_value(),
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    warn!(
                        "Ignoring invalid value '{}' for '{}'; using {}",
                        raw,
                        kind.property_name(),
                        kind.default_value()
                    );
                    kind.default_value()
                }
            },
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut guard = self.current.write();
        let mut next = RuntimeSettings::clone(&guard);
        next.properties.insert(key.into(), value.into());
        *guard = Arc::new(next);
    }

    /// Turns on distributed indexing for the rest of the process lifetime.
    /// Returns `true` if this call changed the setting.
    pub fn enable_distributed_indexing(&self) -> bool {
        let mut guard = self.current.write();
        if guard.distributed_indexing {
            return false;
        }
        let mut next = RuntimeSettings::clone(&guard);
        next.distributed_indexing = true;
        *guard = Arc::new(next);
        DISTRIBUTED_INDEXING_ENABLED.set(1.0);
        info!("Distributed indexing enabled.");
        true
    }

    pub fn distributed_indexing_enabled(&self) -> bool {
        self.current.read().distributed_indexing
    }
}
