//! Configuration data structures for probe workers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;

/// Submission timeout used when `tx_timeout_ms` is zero
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(10);

/// Confirmation wait used when `wait_confirmation_timeout_ms` is zero
pub const DEFAULT_WAIT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(50);

/// Status poll interval used when `status_check_interval_ms` is zero
pub const DEFAULT_STATUS_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Per-cluster probe settings, immutable for the lifetime of a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Independent workers launched for the cluster
    pub num_workers: usize,

    /// Probe attempts per batch
    pub batch_count: usize,

    /// Delay between two attempts of the same batch
    pub batch_interval_ms: u64,

    /// Bound on a single submission and on each status query
    pub tx_timeout_ms: u64,

    /// Overall bound on waiting for a confirmed commitment
    pub wait_confirmation_timeout_ms: u64,

    /// Sleep between two status queries
    pub status_check_interval_ms: u64,

    /// Minimum wall time between the start of two batches
    pub min_per_ping_secs: u64,

    /// Batches slower than this are reported as over budget (0 disables)
    pub max_per_ping_secs: u64,

    /// Transfer destination; the fee payer itself when unset
    pub receiver: Option<String>,

    /// Compute unit limit declared by memo probes
    pub request_units: Option<u32>,

    /// Compute unit price in micro-lamports declared by memo probes
    pub compute_unit_price: Option<u64>,

    /// Log every submitted signature at info level
    pub tx_log: bool,

    /// Consecutive total-loss batches before the connection is rebuilt
    pub reconnect_after_failed_batches: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            batch_count: 1,
            batch_interval_ms: 1_000,
            tx_timeout_ms: 0,
            wait_confirmation_timeout_ms: 0,
            status_check_interval_ms: 0,
            min_per_ping_secs: 60,
            max_per_ping_secs: 0,
            receiver: None,
            request_units: None,
            compute_unit_price: None,
            tx_log: false,
            reconnect_after_failed_batches: 3,
        }
    }
}

impl WorkerConfig {
    /// Create a new configuration builder
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }
}

/// Builder for WorkerConfig
#[derive(Default)]
pub struct WorkerConfigBuilder {
    pub(crate) config: WorkerConfig,
}

/// Everything a worker needs to know about the cluster it probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    pub cluster: Cluster,

    /// Alternate RPC endpoint, preferred over the cluster default
    pub alternate_endpoint: Option<String>,

    pub worker: WorkerConfig,
}
