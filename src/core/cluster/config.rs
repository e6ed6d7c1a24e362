// src/core/cluster/config.rs

//! Defines the cluster-membership configuration options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Holds all configuration settings related to cluster membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// A server whose last heartbeat is older than this window is not considered alive.
    #[serde(with = "humantime_serde", default = "default_heartbeat_timeout")]
    pub heartbeat_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: default_heartbeat_timeout(),
        }
    }
}

fn default_heartbeat_timeout() -> Duration {
    Duration::from_secs(60)
}
