// src/core/search/mod.rs

//! Joining the local search-engine node to its peers.

pub mod settings_file;

use crate::core::ClusterJoinError;
use crate::core::cluster::properties::ClusterJoinProperties;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use settings_file::SettingsFileClient;

/// The search-engine client's node-configuration entry point.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// (Re)configures this node's participation in search-engine clustering.
    async fn apply_node_configuration(
        &self,
        properties: &ClusterJoinProperties,
    ) -> Result<(), ClusterJoinError>;
}

/// Hands the fully resolved discovery properties to the search-engine client.
/// Client failures are returned unchanged; they are fatal to the join.
pub struct SearchEngineJoiner {
    client: Arc<dyn SearchEngineClient>,
}

impl SearchEngineJoiner {
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self { client }
    }

    pub async fn join(&self, properties: &ClusterJoinProperties) -> Result<(), ClusterJoinError> {
        let missing = properties.missing();
        if !missing.is_empty() {
            let keys: Vec<&str> = missing.iter().map(|p| p.key()).collect();
            return Err(ClusterJoinError::Configuration(format!(
                "unresolved join properties: {}",
                keys.join(", ")
            )));
        }
        self.client.apply_node_configuration(properties).await?;
        info!("Search engine node configured for cluster discovery.");
        Ok(())
    }
}
