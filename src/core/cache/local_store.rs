// src/core/cache/local_store.rs

//! The single-node cache store that must not survive into cluster mode.

use crate::config::CacheConfig;
use crate::core::ClusterJoinError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    store_dir: PathBuf,
    trash_dir: PathBuf,
}

impl LocalCacheStore {
    pub fn new(store_dir: impl Into<PathBuf>, trash_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            trash_dir: trash_dir.into(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Path::new(&config.data_dir).join(&config.local_store_dir),
            &config.trash_dir,
        )
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Moves the store directory into the trash directory under a timestamped name.
    /// Returns the new location, or `None` if there was no store to move.
    pub async fn relocate_to_trash(&self) -> Result<Option<PathBuf>, ClusterJoinError> {
        if !fs::try_exists(&self.store_dir).await? {
            return Ok(None);
        }

        fs::create_dir_all(&self.trash_dir).await?;
        let name = self
            .store_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cache-store".to_string());
        let target = self.trash_dir.join(format!(
            "{name}-{}",
            Utc::now().format("%Y%m%d%H%M%S%3f")
        ));

        fs::rename(&self.store_dir, &target).await?;
        info!(
            "Moved single-node cache store {} to {}",
            self.store_dir.display(),
            target.display()
        );
        Ok(Some(target))
    }
}
