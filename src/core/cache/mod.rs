// src/core/cache/mod.rs

//! Registering this server in the distributed cache's membership view.

pub mod client;
pub mod local_store;
pub mod resp_admin;

use crate::core::ClusterJoinError;
use crate::core::cluster::outcome::{DegradedStep, JoinStep, StepOutcome};
use crate::core::settings::ConfigService;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

pub use local_store::LocalCacheStore;
pub use resp_admin::RespCacheAdministrator;

/// The distributed cache's cluster-configuration entry points.
#[async_trait]
pub trait CacheAdministrator: Send + Sync {
    async fn set_cluster_membership(
        &self,
        properties: &HashMap<String, String>,
        server_id: &str,
    ) -> Result<(), ClusterJoinError>;

    /// Checks that the configured cluster can actually be reached.
    async fn test_cluster_connectivity(&self) -> Result<(), ClusterJoinError>;
}

pub struct DistributedCacheJoiner {
    admin: Arc<dyn CacheAdministrator>,
    settings: Arc<ConfigService>,
    local_store: LocalCacheStore,
}

impl DistributedCacheJoiner {
    pub fn new(
        admin: Arc<dyn CacheAdministrator>,
        settings: Arc<ConfigService>,
        local_store: LocalCacheStore,
    ) -> Self {
        Self {
            admin,
            settings,
            local_store,
        }
    }

    /// Joins the cache cluster and enables distributed indexing.
    ///
    /// A membership failure is fatal. A failed connectivity test or store relocation
    /// is logged and returned as a degraded step.
    pub async fn join(
        &self,
        properties: &HashMap<String, String>,
        server_id: &str,
    ) -> Result<Vec<DegradedStep>, ClusterJoinError> {
        let mut degraded = Vec::new();

        self.admin
            .set_cluster_membership(properties, server_id)
            .await?;
        info!("Server {} registered in cache cluster membership.", server_id);

        let connectivity = match self.admin.test_cluster_connectivity().await {
            Ok(()) => StepOutcome::Complete(()),
            Err(e) => {
                error!("Cache cluster connectivity test failed: {}", e);
                StepOutcome::Degraded { value: (), cause: e }
            }
        };
        connectivity.record(JoinStep::CacheConnectivity, &mut degraded);

        self.settings.enable_distributed_indexing();

        let relocation = match self.local_store.relocate_to_trash().await {
            Ok(_) => StepOutcome::Complete(()),
            Err(e) => {
                error!(
                    "Error moving local cache store {} to trash: {}",
                    self.local_store.store_dir().display(),
                    e
                );
                StepOutcome::Degraded { value: (), cause: e }
            }
        };
        relocation.record(JoinStep::LocalStoreRelocation, &mut degraded);

        Ok(degraded)
    }
}
