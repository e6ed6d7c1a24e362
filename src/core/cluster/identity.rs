// src/core/cluster/identity.rs

//! Owns the single cluster-wide identifier.

use crate::core::ClusterJoinError;
use crate::core::metrics::CLUSTER_IDS_CREATED_TOTAL;
use crate::core::persistence::QueryExecutor;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const SELECT_CLUSTER_ID: &str = "SELECT cluster_id FROM cluster";
const INSERT_CLUSTER_ID: &str = "INSERT INTO cluster (cluster_id) VALUES (?)";

pub struct ClusterIdentityStore {
    db: Arc<dyn QueryExecutor>,
}

impl ClusterIdentityStore {
    pub fn new(db: Arc<dyn QueryExecutor>) -> Self {
        Self { db }
    }

    /// Returns the stored cluster id, or `None` if it is not set.
    ///
    /// Read failures are logged and reported as `None`.
    pub async fn cluster_id(&self) -> Option<String> {
        match self.db.query(SELECT_CLUSTER_ID, vec![]).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("cluster_id"))
                .and_then(|value| value.as_str())
                .filter(|id| !id.trim().is_empty())
                .map(str::to_string),
            Err(e) => {
                error!("Could not get cluster id: {}", e);
                None
            }
        }
    }

    /// Returns the cluster id, generating and persisting a new one if none is stored.
    ///
    /// If another node inserts its id between our read and our insert, the storage
    /// layer rejects the second row and the winner's id is returned instead.
    pub async fn ensure_cluster_id(&self) -> Result<String, ClusterJoinError> {
        if let Some(id) = self.cluster_id().await {
            return Ok(id);
        }

        let candidate = Uuid::new_v4().to_string();
        match self
            .db
            .execute(INSERT_CLUSTER_ID, vec![candidate.as_str().into()])
            .await
        {
            Ok(_) => {
                CLUSTER_IDS_CREATED_TOTAL.inc();
                info!("Generated cluster id {}", candidate);
                Ok(candidate)
            }
            Err(ClusterJoinError::DuplicateKey(reason)) => {
                warn!(
                    "Cluster id was created concurrently ({}); re-reading stored id",
                    reason
                );
                self.cluster_id().await.ok_or_else(|| {
                    ClusterJoinError::DataAccess(
                        "cluster id insert conflicted but no id could be read back".to_string(),
                    )
                })
            }
            Err(e) => Err(e),
        }
    }
}
