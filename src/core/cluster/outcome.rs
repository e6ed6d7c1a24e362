// src/core/cluster/outcome.rs

//! Per-step results of a join.
//!
//! A step either completes, degrades to a fallback value, or fails. Failures are
//! plain `Err`s; the first two are captured here so the coordinator applies its
//! error policy in one place and reports what was degraded.

use super::properties::ClusterJoinProperties;
use crate::core::ClusterJoinError;
use crate::core::metrics::DEGRADED_STEPS_TOTAL;
use serde::Serialize;
use std::fmt;

/// The join steps that are allowed to degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinStep {
    CacheConnectivity,
    LocalStoreRelocation,
    TransportPortAllocation,
    HttpPortAllocation,
    AliveServers,
    PersistServer,
}

impl JoinStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            JoinStep::CacheConnectivity => "cache_connectivity",
            JoinStep::LocalStoreRelocation => "local_store_relocation",
            JoinStep::TransportPortAllocation => "transport_port_allocation",
            JoinStep::HttpPortAllocation => "http_port_allocation",
            JoinStep::AliveServers => "alive_servers",
            JoinStep::PersistServer => "persist_server",
        }
    }
}

impl fmt::Display for JoinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The non-fatal result of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    Complete(T),
    /// The step failed and `value` is the fallback the join continues with.
    Degraded { value: T, cause: ClusterJoinError },
}

impl<T> StepOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StepOutcome::Degraded { .. })
    }

    /// Discards the failure cause, if any.
    pub fn into_value(self) -> T {
        match self {
            StepOutcome::Complete(value) | StepOutcome::Degraded { value, .. } => value,
        }
    }

    /// Unwraps the value, recording a degradation under `step` in `degraded`.
    pub fn record(self, step: JoinStep, degraded: &mut Vec<DegradedStep>) -> T {
        match self {
            StepOutcome::Complete(value) => value,
            StepOutcome::Degraded { value, cause } => {
                DEGRADED_STEPS_TOTAL.with_label_values(&[step.as_str()]).inc();
                degraded.push(DegradedStep {
                    step,
                    cause: cause.to_string(),
                });
                value
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedStep {
    pub step: JoinStep,
    pub cause: String,
}

/// What a completed join did.
#[derive(Debug, Clone, Serialize)]
pub struct JoinReport {
    pub server_id: String,
    /// The properties applied to the search-engine node.
    pub properties: ClusterJoinProperties,
    /// Steps that fell back instead of completing, in the order they ran.
    pub degraded: Vec<DegradedStep>,
}

impl JoinReport {
    pub fn is_degraded(&self, step: JoinStep) -> bool {
        self.degraded.iter().any(|d| d.step == step)
    }

    /// `false` when the registry write after the join failed.
    pub fn persisted(&self) -> bool {
        !self.is_degraded(JoinStep::PersistServer)
    }
}
