// src/core/cluster/mod.rs

//! Cluster membership: the cluster identity, the server registry, per-host port
//! allocation, and the join coordinator that ties them together.

pub mod config;
pub mod coordinator;
pub mod identity;
pub mod outcome;
pub mod ports;
pub mod properties;
pub mod registry;
pub mod server;

// Re-export key types for easier access from other modules.
pub use config::ClusterConfig;
pub use coordinator::ClusterMembershipCoordinator;
pub use identity::ClusterIdentityStore;
pub use outcome::{DegradedStep, JoinReport, JoinStep, StepOutcome};
pub use ports::PortAllocator;
pub use properties::{ClusterJoinProperties, JoinProperty};
pub use registry::{ServerRegistry, SqlServerRegistry};
pub use server::{Server, ServerPort};
