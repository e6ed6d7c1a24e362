// src/core/search/settings_file.rs

//! A `SearchEngineClient` that writes the node's discovery settings to the YAML
//! settings file the search node loads on (re)start.

use super::SearchEngineClient;
use crate::core::ClusterJoinError;
use crate::core::cluster::properties::ClusterJoinProperties;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub struct SettingsFileClient {
    path: PathBuf,
    cluster_name: Option<String>,
}

impl SettingsFileClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cluster_name: None,
        }
    }

    /// Adds a `cluster.name` entry so nodes of different clusters never merge.
    pub fn with_cluster_name(mut self, cluster_name: impl Into<String>) -> Self {
        self.cluster_name = Some(cluster_name.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders one `key: "value"` line per setting. Values are JSON strings, which
    /// YAML reads verbatim, so brackets and commas in host lists need no escaping.
    pub fn render(&self, properties: &ClusterJoinProperties) -> Result<String, ClusterJoinError> {
        let mut out = String::new();
        if let Some(name) = &self.cluster_name {
            out.push_str(&format!("cluster.name: {}\n", serde_json::to_string(name)?));
        }
        for (key, value) in properties.iter() {
            // Settings are written without the "es." namespace the overrides use.
            let key = key.strip_prefix("es.").unwrap_or(key);
            out.push_str(&format!("{key}: {}\n", serde_json::to_string(value)?));
        }
        Ok(out)
    }
}

#[async_trait]
impl SearchEngineClient for SettingsFileClient {
    async fn apply_node_configuration(
        &self,
        properties: &ClusterJoinProperties,
    ) -> Result<(), ClusterJoinError> {
        let contents = self.render(properties)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                ClusterJoinError::JoinFailure(format!(
                    "cannot create settings directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        // Write-then-rename so the node never sees a half-written file.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, contents).await.map_err(|e| {
            ClusterJoinError::JoinFailure(format!(
                "cannot write settings file {}: {e}",
                tmp_path.display()
            ))
        })?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            ClusterJoinError::JoinFailure(format!(
                "cannot install settings file {}: {e}",
                self.path.display()
            ))
        })?;

        info!("Wrote search node settings to {}", self.path.display());
        Ok(())
    }
}
