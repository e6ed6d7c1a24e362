// src/core/metrics.rs

//! Defines and registers Prometheus metrics for the join protocol.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire process lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Join Counters ---
    /// The total number of join attempts, labeled by outcome (`ok` or `failed`).
    pub static ref JOINS_TOTAL: CounterVec =
        register_counter_vec!("clusterjoin_joins_total", "Total number of node join attempts, labeled by outcome.", &["outcome"]).unwrap();
    /// The total number of join steps that fell back to a degraded value, labeled by step.
    pub static ref DEGRADED_STEPS_TOTAL: CounterVec =
        register_counter_vec!("clusterjoin_degraded_steps_total", "Total number of degraded join steps, labeled by step.", &["step"]).unwrap();
    /// The total number of failed writes of a joined server record.
    pub static ref SERVER_PERSIST_FAILURES_TOTAL: Counter =
        register_counter!("clusterjoin_server_persist_failures_total", "Total number of failures persisting the joined server record.").unwrap();

    // --- Allocation Counters ---
    /// Ports handed out by the allocator, labeled by port kind and source (`scan` or `default`).
    pub static ref PORTS_ALLOCATED_TOTAL: CounterVec =
        register_counter_vec!("clusterjoin_ports_allocated_total", "Total number of ports allocated, labeled by kind and source.", &["kind", "source"]).unwrap();
    /// The number of cluster ids generated by this process.
    pub static ref CLUSTER_IDS_CREATED_TOTAL: Counter =
        register_counter!("clusterjoin_cluster_ids_created_total", "Total number of cluster ids generated.").unwrap();

    // --- Gauges ---
    /// 1 once distributed indexing has been enabled for this process.
    pub static ref DISTRIBUTED_INDEXING_ENABLED: Gauge =
        register_gauge!("clusterjoin_distributed_indexing_enabled", "Distributed indexing enabled (1 for true, 0 for false).").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
