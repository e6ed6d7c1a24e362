// src/core/mod.rs

//! The central module containing the join protocol and its collaborators.

pub mod cache;
pub mod cluster;
pub mod errors;
pub mod metrics;
pub mod persistence;
pub mod protocol;
pub mod search;
pub mod settings;

pub use errors::ClusterJoinError;
