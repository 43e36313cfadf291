//! Accessors and builder methods for probe configuration.

use std::time::Duration;

use super::types::{
    ClusterSettings, DEFAULT_STATUS_CHECK_INTERVAL, DEFAULT_TX_TIMEOUT,
    DEFAULT_WAIT_CONFIRMATION_TIMEOUT, WorkerConfig, WorkerConfigBuilder,
};
use crate::cluster::Cluster;

fn millis_or(value: u64, default: Duration) -> Duration {
    if value == 0 { default } else { Duration::from_millis(value) }
}

impl WorkerConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    /// Submission and status-query timeout, 10s when unset
    pub fn tx_timeout(&self) -> Duration {
        millis_or(self.tx_timeout_ms, DEFAULT_TX_TIMEOUT)
    }

    /// Raw confirmation wait; the poller substitutes its default for zero
    pub fn wait_confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_confirmation_timeout_ms)
    }

    /// Status poll interval, 1s when unset
    pub fn status_check_interval(&self) -> Duration {
        millis_or(self.status_check_interval_ms, DEFAULT_STATUS_CHECK_INTERVAL)
    }

    pub fn min_per_ping(&self) -> Duration {
        Duration::from_secs(self.min_per_ping_secs)
    }

    /// Time budget for one batch, `None` when disabled
    pub fn max_per_ping(&self) -> Option<Duration> {
        (self.max_per_ping_secs > 0).then(|| Duration::from_secs(self.max_per_ping_secs))
    }

    /// Confirmation wait with the default applied, for display
    pub fn effective_wait_confirmation_timeout(&self) -> Duration {
        millis_or(self.wait_confirmation_timeout_ms, DEFAULT_WAIT_CONFIRMATION_TIMEOUT)
    }
}

impl WorkerConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> WorkerConfig {
        self.config
    }

    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    pub fn batch_count(mut self, count: usize) -> Self {
        self.config.batch_count = count;
        self
    }

    pub fn batch_interval(mut self, interval: Duration) -> Self {
        self.config.batch_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn tx_timeout(mut self, timeout: Duration) -> Self {
        self.config.tx_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn wait_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_confirmation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn status_check_interval(mut self, interval: Duration) -> Self {
        self.config.status_check_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn min_per_ping_secs(mut self, secs: u64) -> Self {
        self.config.min_per_ping_secs = secs;
        self
    }

    pub fn max_per_ping_secs(mut self, secs: u64) -> Self {
        self.config.max_per_ping_secs = secs;
        self
    }

    pub fn receiver(mut self, receiver: impl Into<String>) -> Self {
        self.config.receiver = Some(receiver.into());
        self
    }

    /// Compute budget declared by memo probes
    pub fn compute_budget(mut self, units: u32, micro_lamports: u64) -> Self {
        self.config.request_units = Some(units);
        self.config.compute_unit_price = Some(micro_lamports);
        self
    }

    pub fn tx_log(mut self, enable: bool) -> Self {
        self.config.tx_log = enable;
        self
    }

    pub fn reconnect_after_failed_batches(mut self, batches: u32) -> Self {
        self.config.reconnect_after_failed_batches = batches;
        self
    }
}

impl ClusterSettings {
    pub fn new(cluster: Cluster, worker: WorkerConfig) -> Self {
        Self { cluster, alternate_endpoint: None, worker }
    }

    /// Set an alternate endpoint; blank strings leave the default in place
    pub fn with_alternate_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.alternate_endpoint = (!endpoint.trim().is_empty()).then_some(endpoint);
        self
    }

    /// Endpoint a worker connects to
    pub fn endpoint(&self) -> &str {
        self.alternate_endpoint.as_deref().unwrap_or(self.cluster.default_endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeouts_resolve_to_defaults() {
        let config = WorkerConfig::default();

        assert_eq!(config.tx_timeout(), Duration::from_secs(10));
        assert_eq!(config.status_check_interval(), Duration::from_secs(1));
        assert_eq!(config.wait_confirmation_timeout(), Duration::ZERO);
        assert_eq!(config.effective_wait_confirmation_timeout(), Duration::from_secs(50));
        assert_eq!(config.max_per_ping(), None);
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = WorkerConfig::builder()
            .num_workers(3)
            .batch_count(5)
            .tx_timeout(Duration::from_millis(250))
            .status_check_interval(Duration::from_millis(50))
            .max_per_ping_secs(90)
            .compute_budget(500, 10)
            .build();

        assert_eq!(config.num_workers, 3);
        assert_eq!(config.batch_count, 5);
        assert_eq!(config.tx_timeout(), Duration::from_millis(250));
        assert_eq!(config.status_check_interval(), Duration::from_millis(50));
        assert_eq!(config.max_per_ping(), Some(Duration::from_secs(90)));
        assert_eq!(config.request_units, Some(500));
        assert_eq!(config.compute_unit_price, Some(10));
    }

    #[test]
    fn test_alternate_endpoint_preferred() {
        let settings = ClusterSettings::new(Cluster::Devnet, WorkerConfig::default());
        assert_eq!(settings.endpoint(), "https://api.devnet.solana.com");

        let settings = settings.with_alternate_endpoint("http://127.0.0.1:8899");
        assert_eq!(settings.endpoint(), "http://127.0.0.1:8899");

        let blank = ClusterSettings::new(Cluster::Mainnet, WorkerConfig::default())
            .with_alternate_endpoint("  ");
        assert_eq!(blank.endpoint(), "https://api.mainnet-beta.solana.com");
    }
}
