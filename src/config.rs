// src/config.rs

//! Manages configuration: loading the TOML file, applying defaults, and validation.

use crate::core::cluster::ClusterConfig;
use crate::core::cluster::server::ServerPort;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Location of the SQLite database backing the cluster and server tables.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatabaseConfig {
    /// Path of the database file. `:memory:` opens a private in-memory database.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "clusterjoin_data/cluster.db".to_string()
}

/// Configuration for the distributed cache layer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheConfig {
    /// Overrides the address the local cache node is reached on. Empty means the server's IP.
    #[serde(default)]
    pub host: String,
    /// The active data directory holding the single-node cache store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Name of the single-node store directory inside `data_dir`.
    #[serde(default = "default_local_store_dir")]
    pub local_store_dir: String,
    /// Where a stale single-node store is moved when the node joins a cluster.
    #[serde(default = "default_trash_dir")]
    pub trash_dir: String,
    /// Connect/read timeout used when talking to cache nodes.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

fn default_data_dir() -> String {
    "clusterjoin_data".to_string()
}
fn default_local_store_dir() -> String {
    "h2db".to_string()
}
fn default_trash_dir() -> String {
    "clusterjoin_data/trash".to_string()
}
fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            data_dir: default_data_dir(),
            local_store_dir: default_local_store_dir(),
            trash_dir: default_trash_dir(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Configuration for the local search-engine node.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchConfig {
    /// The settings file the search node reads its discovery configuration from.
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Prefix for the search cluster name; the cluster id is appended.
    #[serde(default = "default_cluster_name_prefix")]
    pub cluster_name_prefix: String,
}

fn default_settings_path() -> String {
    "clusterjoin_data/search-node.yml".to_string()
}
fn default_cluster_name_prefix() -> String {
    "clusterjoin_".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            cluster_name_prefix: default_cluster_name_prefix(),
        }
    }
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    cluster: ClusterConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    properties: BTreeMap<String, toml::Value>,
}

/// Upper bound for `cluster.heartbeat_timeout`.
const MAX_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

fn default_log_level() -> String {
    "info".to_string()
}

/// Represents the final, validated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    /// Process-wide key/value settings, e.g. port defaults keyed by property name.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database: DatabaseConfig::default(),
            cluster: ClusterConfig::default(),
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            properties: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load configuration from '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig = toml::from_str(contents).context("Failed to parse TOML")?;

        // Scalars in [properties] are accepted in any TOML type and kept as strings.
        let properties = raw_config
            .properties
            .into_iter()
            .map(|(key, value)| match value {
                toml::Value::String(s) => Ok((key, s)),
                toml::Value::Integer(i) => Ok((key, i.to_string())),
                toml::Value::Boolean(b) => Ok((key, b.to_string())),
                toml::Value::Float(f) => Ok((key, f.to_string())),
                other => Err(anyhow!(
                    "property '{key}' must be a scalar value, found {}",
                    other.type_str()
                )),
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let config = Config {
            log_level: raw_config.log_level,
            database: raw_config.database,
            cluster: raw_config.cluster,
            cache: raw_config.cache,
            search: raw_config.search,
            properties,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow!("database.path cannot be empty"));
        }
        if self.cluster.heartbeat_timeout.is_zero() {
            return Err(anyhow!("cluster.heartbeat_timeout cannot be 0"));
        }
        if self.cluster.heartbeat_timeout > MAX_HEARTBEAT_TIMEOUT {
            return Err(anyhow!(
                "cluster.heartbeat_timeout cannot exceed {} days",
                MAX_HEARTBEAT_TIMEOUT.as_secs() / 86_400
            ));
        }
        if self.search.settings_path.trim().is_empty() {
            return Err(anyhow!("search.settings_path cannot be empty"));
        }
        if self.cache.local_store_dir.trim().is_empty() {
            return Err(anyhow!("cache.local_store_dir cannot be empty"));
        }

        for port in ServerPort::ALL {
            if let Some(value) = self.properties.get(port.property_name()) {
                match value.trim().parse::<u16>() {
                    Ok(0) | Err(_) => {
                        return Err(anyhow!(
                            "property '{}' must be a port number between 1 and 65535, got '{}'",
                            port.property_name(),
                            value
                        ));
                    }
                    Ok(_) => {}
                }
            }
        }

        if self.cache.connect_timeout.is_zero() {
            warn!("cache.connect_timeout is 0; cache connectivity checks will fail immediately.");
        }
        Ok(())
    }
}
