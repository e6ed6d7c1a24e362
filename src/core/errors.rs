// src/core/errors.rs

//! Defines the primary error type for the cluster join library.

use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing every failure the join protocol can surface.
#[derive(Error, Debug)]
pub enum ClusterJoinError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// Any failure reading or writing persisted state.
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// A write was rejected by a uniqueness constraint at the storage layer.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The search-engine node rejected the supplied configuration.
    #[error("Search engine join failed: {0}")]
    JoinFailure(String),

    #[error("Cache cluster error: {0}")]
    CacheCluster(String),

    #[error("Internal Error: {0}")]
    Internal(String),
}

impl ClusterJoinError {
    /// Returns `true` for failures that originate in the persistence layer.
    pub fn is_data_access(&self) -> bool {
        matches!(
            self,
            ClusterJoinError::DataAccess(_)
                | ClusterJoinError::DuplicateKey(_)
                | ClusterJoinError::NotFound(_)
        )
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ClusterJoinError {
    fn clone(&self) -> Self {
        match self {
            ClusterJoinError::Io(e) => ClusterJoinError::Io(Arc::clone(e)),
            ClusterJoinError::DataAccess(s) => ClusterJoinError::DataAccess(s.clone()),
            ClusterJoinError::DuplicateKey(s) => ClusterJoinError::DuplicateKey(s.clone()),
            ClusterJoinError::NotFound(s) => ClusterJoinError::NotFound(s.clone()),
            ClusterJoinError::Configuration(s) => ClusterJoinError::Configuration(s.clone()),
            ClusterJoinError::JoinFailure(s) => ClusterJoinError::JoinFailure(s.clone()),
            ClusterJoinError::CacheCluster(s) => ClusterJoinError::CacheCluster(s.clone()),
            ClusterJoinError::Internal(s) => ClusterJoinError::Internal(s.clone()),
        }
    }
}

impl PartialEq for ClusterJoinError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ClusterJoinError::Io(e1), ClusterJoinError::Io(e2)) => {
                e1.to_string() == e2.to_string()
            }
            (ClusterJoinError::DataAccess(s1), ClusterJoinError::DataAccess(s2))
            | (ClusterJoinError::DuplicateKey(s1), ClusterJoinError::DuplicateKey(s2))
            | (ClusterJoinError::NotFound(s1), ClusterJoinError::NotFound(s2))
            | (ClusterJoinError::Configuration(s1), ClusterJoinError::Configuration(s2))
            | (ClusterJoinError::JoinFailure(s1), ClusterJoinError::JoinFailure(s2))
            | (ClusterJoinError::CacheCluster(s1), ClusterJoinError::CacheCluster(s2))
            | (ClusterJoinError::Internal(s1), ClusterJoinError::Internal(s2)) => s1 == s2,
            _ => false,
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ClusterJoinError {
    fn from(e: std::io::Error) -> Self {
        ClusterJoinError::Io(Arc::new(e))
    }
}

impl From<rusqlite::Error> for ClusterJoinError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ClusterJoinError::DuplicateKey(e.to_string())
            }
            _ => ClusterJoinError::DataAccess(e.to_string()),
        }
    }
}

impl From<ParseIntError> for ClusterJoinError {
    fn from(e: ParseIntError) -> Self {
        ClusterJoinError::Configuration(format!("invalid integer value: {e}"))
    }
}

impl From<serde_json::Error> for ClusterJoinError {
    fn from(e: serde_json::Error) -> Self {
        ClusterJoinError::Internal(format!("JSON serialization error: {e}"))
    }
}

impl From<tokio::task::JoinError> for ClusterJoinError {
    fn from(e: tokio::task::JoinError) -> Self {
        ClusterJoinError::Internal(format!("blocking task failed: {e}"))
    }
}
