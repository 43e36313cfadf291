//! Probe configuration.
//!
//! [`WorkerConfig`] is the single canonical per-cluster probe schema.
//! Zero timeouts and intervals resolve to fixed defaults through accessor
//! methods instead of being rejected.

mod methods;
mod types;

pub use types::{
    ClusterSettings, DEFAULT_STATUS_CHECK_INTERVAL, DEFAULT_TX_TIMEOUT,
    DEFAULT_WAIT_CONFIRMATION_TIMEOUT, WorkerConfig, WorkerConfigBuilder,
};
